//! Request integrity check for anonymous reads.
//!
//! The caller sends a hex HMAC-SHA256 of the request's identifying payload
//! in the `x-hash` header, keyed by a secret that never leaves the server.
//! The digest is deterministic: the same payload always yields the same
//! digest, so a captured header can be replayed. This is tamper evidence,
//! not replay protection.

mod payload;

use std::fmt;

use hmac::{Hmac, Mac};
use metrics::counter;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::warn;

pub use payload::{DEFAULT_PAYLOAD, IntegrityPayload};

/// Request header carrying the caller's digest.
pub const DIGEST_HEADER: &str = "x-hash";

const METRIC_INTEGRITY_REJECTED: &str = "muster_integrity_rejected_total";

type HmacSha256 = Hmac<Sha256>;

/// Whether the check is enforced, and the secret digests are keyed with.
#[derive(Clone, Default)]
pub struct IntegrityConfig {
    pub enabled: bool,
    pub secret: String,
}

impl fmt::Debug for IntegrityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrityConfig")
            .field("enabled", &self.enabled)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl From<&crate::config::IntegritySettings> for IntegrityConfig {
    fn from(settings: &crate::config::IntegritySettings) -> Self {
        Self {
            enabled: settings.enabled,
            secret: settings.secret.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("request digest is missing")]
    Missing,
    #[error("request digest does not match")]
    Mismatch,
    #[error("integrity secret cannot key the digest")]
    InvalidSecret,
}

impl IntegrityError {
    pub fn reason(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Mismatch => "mismatch",
            Self::InvalidSecret => "invalid_secret",
        }
    }
}

/// Computes and checks payload digests.
#[derive(Clone)]
pub struct IntegrityVerifier {
    enabled: bool,
    keyed: HmacSha256,
}

impl fmt::Debug for IntegrityVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrityVerifier")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl IntegrityVerifier {
    pub fn new(config: IntegrityConfig) -> Result<Self, IntegrityError> {
        let keyed = HmacSha256::new_from_slice(config.secret.as_bytes())
            .map_err(|_| IntegrityError::InvalidSecret)?;
        Ok(Self {
            enabled: config.enabled,
            keyed,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Lowercase hex HMAC-SHA256 of `payload` under the configured secret.
    pub fn digest(&self, payload: &str) -> String {
        let mut mac = self.keyed.clone();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Exact, constant-time comparison of `candidate` against `digest(payload)`.
    pub fn verify(&self, candidate: &str, payload: &str) -> bool {
        let expected = self.digest(payload);
        expected.as_bytes().ct_eq(candidate.as_bytes()).into()
    }

    /// Gate one request. Always passes when the check is disabled.
    pub fn check(
        &self,
        candidate: Option<&str>,
        payload: &IntegrityPayload,
    ) -> Result<(), IntegrityError> {
        if !self.enabled {
            return Ok(());
        }

        let outcome = match candidate {
            None => Err(IntegrityError::Missing),
            Some(candidate) if self.verify(candidate, payload.as_str()) => Ok(()),
            Some(_) => Err(IntegrityError::Mismatch),
        };

        if let Err(err) = outcome {
            counter!(METRIC_INTEGRITY_REJECTED, "reason" => err.reason()).increment(1);
            warn!(
                integrity = "rejected",
                reason = err.reason(),
                payload_len = payload.as_str().len(),
                "Request digest rejected"
            );
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier(secret: &str) -> IntegrityVerifier {
        IntegrityVerifier::new(IntegrityConfig {
            enabled: true,
            secret: secret.to_string(),
        })
        .expect("any secret length keys an HMAC")
    }

    #[test]
    fn digest_matches_rfc4231_vector() {
        let verifier = verifier("Jefe");
        assert_eq!(
            verifier.digest("what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn long_secrets_are_accepted() {
        let verifier = verifier(&"k".repeat(200));
        assert_eq!(verifier.digest("17").len(), 64);
    }

    #[test]
    fn digest_is_deterministic() {
        let verifier = verifier("s3cret");
        assert_eq!(verifier.digest("17"), verifier.digest("17"));
        assert_eq!(verifier.digest("17").len(), 64);
        assert!(
            verifier
                .digest("17")
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
    }

    #[test]
    fn digest_depends_on_payload_and_secret() {
        let verifier = verifier("s3cret");
        assert_ne!(verifier.digest("17"), verifier.digest("18"));
        assert_ne!(verifier.digest("17"), self::verifier("other").digest("17"));
    }

    #[test]
    fn secret_and_payload_boundary_is_unambiguous() {
        assert_ne!(verifier("ab").digest("c"), verifier("a").digest("bc"));
    }

    #[test]
    fn verify_is_symmetric() {
        let verifier = verifier("s3cret");
        for payload in ["", "17", "Default Payload", "Shoes"] {
            assert!(verifier.verify(&verifier.digest(payload), payload));
        }
        assert!(!verifier.verify(&verifier.digest("17"), "18"));
        assert!(!verifier.verify("", "17"));
    }

    #[test]
    fn negative_id_scenario() {
        let verifier = verifier("s3cret");
        let payload = IntegrityPayload::from_id(-56);

        assert_eq!(verifier.check(Some(&verifier.digest("-56")), &payload), Ok(()));
        assert_eq!(
            verifier.check(Some(&verifier.digest("56")), &payload),
            Err(IntegrityError::Mismatch)
        );
    }

    #[test]
    fn missing_digest_fails_closed() {
        let verifier = verifier("s3cret");
        assert_eq!(
            verifier.check(None, &IntegrityPayload::default_payload()),
            Err(IntegrityError::Missing)
        );
    }

    #[test]
    fn disabled_verifier_accepts_everything() {
        let verifier =
            IntegrityVerifier::new(IntegrityConfig::default()).expect("empty secret keys an HMAC");
        let payload = IntegrityPayload::default_payload();
        assert!(!verifier.is_enabled());
        assert_eq!(verifier.check(None, &payload), Ok(()));
        assert_eq!(verifier.check(Some("garbage"), &payload), Ok(()));
    }

    #[test]
    fn debug_output_hides_secret() {
        let config = IntegrityConfig {
            enabled: true,
            secret: "s3cret".to_string(),
        };
        assert!(!format!("{config:?}").contains("s3cret"));
        let verifier = IntegrityVerifier::new(config).expect("verifier");
        assert!(!format!("{verifier:?}").contains("s3cret"));
    }
}
