//! Post-login redirect target validation.

/// Returns `raw` if it is safe to redirect a browser to after sign-in.
///
/// Only same-origin absolute paths are accepted: the target must start with
/// a single `/`, and must not contain a backslash or control characters.
/// Browsers treat `//host` and `/\host` as references to another origin.
pub fn local_target(raw: &str) -> Option<&str> {
    let rest = raw.strip_prefix('/')?;
    if rest.starts_with('/') {
        return None;
    }
    if raw.chars().any(|c| c == '\\' || c.is_control()) {
        return None;
    }
    Some(raw)
}
