use muster::integrity::{IntegrityConfig, IntegrityError, IntegrityPayload, IntegrityVerifier};

fn enabled(secret: &str) -> IntegrityVerifier {
    IntegrityVerifier::new(IntegrityConfig {
        enabled: true,
        secret: secret.to_string(),
    })
    .expect("verifier")
}

#[test]
fn negative_id_payload_is_verified_exactly() {
    let verifier = enabled("shared-secret");
    let payload = IntegrityPayload::from_id(-56);
    assert_eq!(payload.as_str(), "-56");

    let good = verifier.digest("-56");
    let wrong_sign = verifier.digest("56");

    assert_eq!(verifier.check(Some(&good), &payload), Ok(()));
    assert_eq!(
        verifier.check(Some(&wrong_sign), &payload),
        Err(IntegrityError::Mismatch)
    );
}

#[test]
fn digests_depend_on_the_secret() {
    let payload = IntegrityPayload::default_payload();
    let ours = enabled("alpha").digest(payload.as_str());
    let theirs = enabled("beta").digest(payload.as_str());

    assert_ne!(ours, theirs);
    assert_eq!(
        enabled("beta").check(Some(&ours), &payload),
        Err(IntegrityError::Mismatch)
    );
}

#[test]
fn uppercase_hex_is_not_accepted() {
    let verifier = enabled("shared-secret");
    let payload = IntegrityPayload::from_name("Bello");
    let upper = verifier.digest(payload.as_str()).to_uppercase();

    assert_eq!(
        verifier.check(Some(&upper), &payload),
        Err(IntegrityError::Mismatch)
    );
}

#[test]
fn disabled_verifier_lets_everything_through() {
    let verifier = IntegrityVerifier::new(IntegrityConfig::default()).expect("verifier");
    let payload = IntegrityPayload::from_id(1);

    assert!(!verifier.is_enabled());
    assert_eq!(verifier.check(None, &payload), Ok(()));
    assert_eq!(verifier.check(Some("garbage"), &payload), Ok(()));
}
