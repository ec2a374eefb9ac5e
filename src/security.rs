use subtle::ConstantTimeEq;

/// Constant-time string comparison to prevent timing attacks
/// Use this for comparing API secrets and other sensitive values
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Check an `Authorization` header value against the configured secret.
pub fn is_authorized_bearer(header: Option<&str>, secret: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| constant_time_compare(token.trim(), secret))
        .unwrap_or(false)
}
