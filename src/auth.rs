//! API key check for the conversion endpoint

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::AuthPolicy;
use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the caller's key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests whose `x-api-key` does not match the configured secret.
///
/// Runs before the handler extracts the body, so a rejected request causes
/// no file I/O and no converter call.
pub async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let supplied = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if !is_authorized(&state.config().auth, supplied) {
        tracing::warn!(
            path = %request.uri().path(),
            header_present = supplied.is_some(),
            "Rejected request with invalid API key"
        );
        return AppError::Unauthorized.into_response();
    }

    next.run(request).await
}

/// Whether `supplied` satisfies `policy`
pub fn is_authorized(policy: &AuthPolicy, supplied: Option<&str>) -> bool {
    match policy {
        AuthPolicy::Disabled => true,
        AuthPolicy::ApiKey(secret) => supplied.is_some_and(|key| keys_match(secret, key)),
    }
}

/// Exact equality without an early exit on the first differing byte
fn keys_match(expected: &str, supplied: &str) -> bool {
    let (expected, supplied) = (expected.as_bytes(), supplied.as_bytes());
    if expected.len() != supplied.len() {
        return false;
    }
    expected
        .iter()
        .zip(supplied)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_policy_accepts_anything() {
        assert!(is_authorized(&AuthPolicy::Disabled, None));
        assert!(is_authorized(&AuthPolicy::Disabled, Some("whatever")));
    }

    #[test]
    fn test_api_key_policy() {
        let policy = AuthPolicy::ApiKey("s3cret".to_string());

        assert!(is_authorized(&policy, Some("s3cret")));
        assert!(!is_authorized(&policy, Some("s3cret ")));
        assert!(!is_authorized(&policy, Some("S3CRET")));
        assert!(!is_authorized(&policy, Some("s3cre")));
        assert!(!is_authorized(&policy, Some("")));
        assert!(!is_authorized(&policy, None));
    }
}
