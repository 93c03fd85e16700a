//! Return-URL sanitizing.
//!
//! Only same-origin absolute paths survive. Anything that could leave the
//! application (scheme, protocol-relative, backslash tricks) or bounce back
//! into the login flow is dropped. The login flow is the configured login
//! route plus everything under `/auth`.

const AUTH_PREFIX: &str = "/auth";

/// Returns the URL unchanged when it is a safe in-app destination.
pub fn sanitize_return_url(raw: &str, login_route: &str) -> Option<String> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        return None;
    }

    // Check both forms: encoded payloads must not sneak past the checks.
    let decoded = urlencoding::decode(candidate).ok()?;
    if !is_safe_path(candidate, login_route) || !is_safe_path(&decoded, login_route) {
        return None;
    }

    Some(candidate.to_string())
}

/// Sanitize an optional target, falling back to `fallback`.
pub fn sanitize_or(raw: Option<&str>, fallback: &str, login_route: &str) -> String {
    raw.and_then(|url| sanitize_return_url(url, login_route))
        .unwrap_or_else(|| fallback.to_string())
}

/// Login URL carrying `returnUrl` when the attempted URL is worth returning to.
pub fn login_url(login_route: &str, attempted_url: &str) -> String {
    match sanitize_return_url(attempted_url, login_route) {
        Some(target) => format!(
            "{}?returnUrl={}",
            login_route,
            urlencoding::encode(&target)
        ),
        None => login_route.to_string(),
    }
}

fn is_safe_path(path: &str, login_route: &str) -> bool {
    if !path.starts_with('/') || path.starts_with("//") || path.starts_with("/\\") {
        return false;
    }
    if path.contains("://") || path.chars().any(char::is_control) {
        return false;
    }
    !is_login_loop(path, login_route)
}

fn is_login_loop(path: &str, login_route: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    let login = login_route.trim_end_matches('/').to_ascii_lowercase();
    let is_loop = [login.as_str(), AUTH_PREFIX]
        .into_iter()
        .filter(|prefix| !prefix.is_empty())
        .any(|prefix| {
            lower
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?', '#']))
        });
    is_loop
}
