//! End-to-end behaviour of signatories over the compact codec

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use warrant_token::{
    ClaimSet, MethodRegistry, Signatory, TokenError, ValidationFlags, DEFAULT_TIMESTAMP_FORMAT,
};

fn registry() -> Arc<MethodRegistry> {
    Arc::new(MethodRegistry::with_defaults())
}

fn issue_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn send_reset() -> Signatory {
    Signatory::builder("send_reset")
        .secret("k")
        .build(registry())
        .unwrap()
}

fn encrypted() -> Signatory {
    Signatory::builder("send_reset")
        .secret("k")
        .encryption_key(vec![0x42; 24])
        .build(registry())
        .unwrap()
}

#[test]
fn test_send_reset_scenario() {
    let signatory = send_reset();
    let token = signatory
        .signed_string_from_pairs(["ut:user-42", "remember:false"])
        .unwrap();
    assert_eq!(token.as_str().split('.').count(), 3);

    let parsed = signatory.valid(token.as_str()).unwrap();
    let claims = parsed.claims();
    assert_eq!(claims.get("ut"), Some("user-42"));
    assert_eq!(claims.get("remember"), Some("false"));
    assert!(claims.get("iat").is_some());
    assert_eq!(claims.get("timestamp_format"), Some(DEFAULT_TIMESTAMP_FORMAT));

    let extended = format!("{token}x");
    let err = signatory.valid(&extended).unwrap_err();
    assert!(err.validation_flags().is_some());
    assert_eq!(err.public_message(), "invalid token");
}

#[test]
fn test_send_reset_scenario_encrypted() {
    let signatory = encrypted();
    let token = signatory
        .signed_string_from_pairs(["ut:user-42", "remember:false"])
        .unwrap();
    assert!(!token.as_str().contains('.'));

    let parsed = signatory.valid(token.as_str()).unwrap();
    assert_eq!(parsed.claims().get("ut"), Some("user-42"));

    // Appending to the blob either breaks the base64 layer or corrupts the
    // decrypted compact string; both are rejected.
    assert!(signatory.valid(&format!("{token}x")).is_err());
}

#[test]
fn test_expired_with_valid_signature() {
    let signatory = send_reset();
    let claims = ClaimSet::new().expires_at(issue_time() + Duration::seconds(1));
    let token = signatory.signed_string_at(&claims, issue_time()).unwrap();

    let parsed = signatory
        .inspect_at(token.as_str(), issue_time() + Duration::seconds(2))
        .unwrap();
    let err = parsed.validation().clone().unwrap_err();
    assert_eq!(err.flags, ValidationFlags::EXPIRED);
    assert_eq!(err.message, "token is expired");
}

#[test]
fn test_not_yet_valid() {
    let signatory = send_reset();
    let claims = ClaimSet::new().not_before(issue_time() + Duration::hours(1));
    let token = signatory.signed_string_at(&claims, issue_time()).unwrap();

    let err = signatory.valid_at(token.as_str(), issue_time()).unwrap_err();
    assert_eq!(err.validation_flags(), Some(ValidationFlags::NOT_VALID_YET));
    assert!(signatory
        .valid_at(token.as_str(), issue_time() + Duration::hours(2))
        .is_ok());
}

#[test]
fn test_custom_timestamp_format_roundtrip() {
    let signatory = Signatory::builder("signed")
        .secret("k")
        .timestamp_format("%d %b %Y %H:%M:%S %z")
        .build(registry())
        .unwrap();
    let claims = ClaimSet::new().expires_at(issue_time() + Duration::minutes(5));
    let token = signatory.signed_string_at(&claims, issue_time()).unwrap();

    let parsed = signatory.valid_at(token.as_str(), issue_time()).unwrap();
    assert_eq!(parsed.claims().get("iat"), Some("14 Nov 2023 22:13:20 +0000"));
    assert!(signatory
        .valid_at(token.as_str(), issue_time() + Duration::minutes(6))
        .is_err());
}

#[test]
fn test_malformed_input() {
    let signatory = send_reset();
    for input in ["", "not a token", "a.b", "a.b.c.d"] {
        let err = signatory.valid(input).unwrap_err();
        assert_eq!(err.validation_flags(), Some(ValidationFlags::MALFORMED), "{input}");
    }
}

#[test]
fn test_encrypted_signatory_rejects_plain_token() {
    let plain = send_reset().signed_string(&ClaimSet::new()).unwrap();
    let err = encrypted().valid(plain.as_str()).unwrap_err();
    assert!(matches!(
        err,
        TokenError::Cipher(_) | TokenError::Validation(_)
    ));
}

#[test]
fn test_concurrent_use() {
    let signatory = Arc::new(send_reset());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let signatory = Arc::clone(&signatory);
            std::thread::spawn(move || {
                let token = signatory
                    .signed_string(&ClaimSet::new().extra("n", i.to_string()))
                    .unwrap();
                let parsed = signatory.valid(token.as_str()).unwrap();
                parsed.claims().get("n").map(str::to_string)
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Some(i.to_string()));
    }
}

fn extra_claims() -> impl Strategy<Value = BTreeMap<String, String>> {
    proptest::collection::btree_map("x[a-z0-9_]{0,7}", "[^:]{0,24}", 0..6)
}

proptest! {
    #[test]
    fn prop_roundtrip_keeps_caller_claims(extras in extra_claims()) {
        let signatory = send_reset();
        let items: Vec<String> = extras.iter().map(|(k, v)| format!("{k}:{v}")).collect();
        let token = signatory.signed_string_from_pairs(&items).unwrap();

        let parsed = signatory.valid(token.as_str()).unwrap();
        for (k, v) in &extras {
            prop_assert_eq!(parsed.claims().get(k), Some(v.as_str()));
        }
        prop_assert!(parsed.claims().get("iat").is_some());
    }

    #[test]
    fn prop_single_byte_flip_is_rejected(
        extras in extra_claims(),
        index in any::<prop::sample::Index>(),
    ) {
        let signatory = send_reset();
        let items = extras.iter().map(|(k, v)| format!("{k}:{v}"));
        let token = signatory
            .signed_string_at(&ClaimSet::from_pairs(items), issue_time())
            .unwrap()
            .into_string();
        let last_dot = token.rfind('.').unwrap();

        let mut bytes = token.into_bytes();
        let at = index.index(bytes.len());
        bytes[at] ^= 0x01;
        let flipped = String::from_utf8(bytes).unwrap();

        let err = signatory.valid_at(&flipped, issue_time()).unwrap_err();
        let flags = err.validation_flags().unwrap();
        prop_assert!(!flags.is_empty());
        if at > last_dot {
            prop_assert_eq!(flags, ValidationFlags::SIGNATURE_INVALID);
        }
    }

    #[test]
    fn prop_encrypted_garbage_never_panics(input in "[A-Za-z0-9_=-]{0,96}") {
        let _ = encrypted().valid(&input);
    }
}
