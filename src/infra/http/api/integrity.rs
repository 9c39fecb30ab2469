use axum::http::HeaderMap;

use crate::integrity::{DIGEST_HEADER, IntegrityPayload, IntegrityVerifier};

use super::error::ApiError;

/// Check the `x-hash` header against `payload` before any data access.
///
/// A header that is not valid visible ASCII counts as a mismatch.
pub fn require_digest(
    verifier: &IntegrityVerifier,
    headers: &HeaderMap,
    payload: &IntegrityPayload,
) -> Result<(), ApiError> {
    let candidate = headers
        .get(DIGEST_HEADER)
        .map(|value| value.to_str().unwrap_or_default());
    verifier.check(candidate, payload)?;
    Ok(())
}
