//! Manager behaviour across purposes, leased tokens and configuration files

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use warrant_common::ManualClock;
use warrant_security::{Manager, SecurityConfig, SecurityError, SignatoryConfig, UserLookup};
use warrant_token::{ClaimSet, MethodRegistry, TokenError, ValidationFlags};

struct Users(HashMap<String, String>);

impl UserLookup for Users {
    type User = String;

    fn lookup(&self, id: &str) -> Option<String> {
        self.0.get(id).cloned()
    }
}

fn users() -> Users {
    Users(HashMap::from([(
        "user-42".to_string(),
        "ada@example.com".to_string(),
    )]))
}

fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn registry() -> Arc<MethodRegistry> {
    Arc::new(MethodRegistry::with_defaults())
}

fn manager_at(clock: Arc<ManualClock>) -> Manager {
    Manager::with_clock(&SecurityConfig::new("s3cret"), registry(), clock).unwrap()
}

fn manager() -> (Manager, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start()));
    (manager_at(clock.clone()), clock)
}

#[test]
fn test_manager_from_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "secret_key": "from-file",
            "timestamp_format": "%Y-%m-%d %H:%M:%S",
            "signatories": {{
                "send_reset": {{ "encryption_key": "0123456789abcdef" }},
                "api": {{ "algorithm": "HS384", "duration": "15m" }}
            }}
        }}"#
    )
    .unwrap();

    let config = SecurityConfig::from_file(file.path()).unwrap();
    let manager = Manager::new(&config, registry()).unwrap();

    let reset = manager.signatory("send_reset");
    assert!(reset.is_encrypted());
    let token = reset
        .signed_string_from_pairs(["ut:user-42", "remember:false"])
        .unwrap();
    assert!(!token.as_str().contains('.'));
    let parsed = reset.valid(token.as_str()).unwrap();
    assert_eq!(parsed.claims().get("ut"), Some("user-42"));
    assert_eq!(parsed.claims().get("purpose"), Some("send_reset"));

    let api = manager.signatory("api");
    assert_eq!(api.alg(), "HS384");
    assert_eq!(manager.times().duration("api"), Duration::minutes(15));
    assert!(manager.purposes().any(|p| p == "api"));
}

#[test]
fn test_purposes_do_not_accept_each_others_tokens() {
    let (manager, _) = manager();
    let confirm = manager
        .signatory("send_confirm")
        .signed_string(&ClaimSet::new().subject("user-42"))
        .unwrap();
    let err = manager
        .signatory("send_reset")
        .valid(confirm.as_str())
        .unwrap_err();
    assert_eq!(err.validation_flags(), Some(ValidationFlags::SIGNATURE_INVALID));

    let packed = manager.generate_token("send_confirm", &["user-42"]).unwrap();
    assert!(matches!(
        manager.valid_token("send_reset", &packed),
        Err(SecurityError::InvalidToken)
    ));
}

#[test]
fn test_leased_token_carries_nonce_claim() {
    let (manager, _) = manager();
    let leased = manager.signatory("leased_token");
    let a = leased.token(&ClaimSet::new()).unwrap();
    let b = leased.token(&ClaimSet::new()).unwrap();
    assert!(a.claims().get("nonce").is_some());
    assert_ne!(a.claims().get("nonce"), b.claims().get("nonce"));
    assert!(manager
        .signatory("send_reset")
        .token(&ClaimSet::new())
        .unwrap()
        .claims()
        .get("nonce")
        .is_none());
}

#[test]
fn test_issue_redeem_max_age() {
    let (manager, clock) = manager();
    let token = manager.issue("leased_token").unwrap();

    assert!(manager.redeem("leased_token", &token, Duration::zero()));
    clock.advance(Duration::milliseconds(1));
    assert!(!manager.redeem("leased_token", &token, Duration::zero()));

    assert!(manager.redeem("leased_token", &token, Duration::hours(1)));
    clock.set(start() + Duration::hours(1));
    assert!(manager.redeem("leased_token", &token, Duration::hours(1)));
    clock.advance(Duration::seconds(1));
    assert!(!manager.redeem("leased_token", &token, Duration::hours(1)));
}

#[test]
fn test_issued_leases_are_unique_and_bound_to_name() {
    let (manager, _) = manager();
    let first = manager.issue("leased_token").unwrap();
    let second = manager.issue("leased_token").unwrap();
    assert_ne!(first, second);
    assert!(!manager.redeem("passwordless", &first, Duration::hours(1)));
}

#[test]
fn test_leased_token_uses_configured_duration() {
    let (manager, clock) = manager();
    let token = manager.leased_token().unwrap();

    clock.advance(Duration::minutes(4));
    assert!(manager.valid_leased_token(&token));
    clock.advance(Duration::minutes(2));
    assert!(!manager.valid_leased_token(&token));
    assert!(!manager.valid_leased_token("garbage"));
}

#[test]
fn test_valid_user_token() {
    let (manager, clock) = manager();
    let users = users();

    let remembered = manager
        .generate_token("passwordless", &["user-42", "true"])
        .unwrap();
    let (user, remember) = manager
        .valid_user_token("passwordless", &remembered, &users)
        .unwrap();
    assert_eq!(user, "ada@example.com");
    assert!(remember);

    let unclear = manager
        .generate_token("passwordless", &["user-42", "maybe"])
        .unwrap();
    let (_, remember) = manager
        .valid_user_token("passwordless", &unclear, &users)
        .unwrap();
    assert!(!remember);

    let bare = manager.generate_token("passwordless", &["user-42"]).unwrap();
    assert!(!manager.valid_user_token("passwordless", &bare, &users).unwrap().1);

    let stranger = manager
        .generate_token("passwordless", &["user-7", "true"])
        .unwrap();
    assert!(matches!(
        manager.valid_user_token("passwordless", &stranger, &users),
        Err(SecurityError::UnknownUser)
    ));

    clock.advance(Duration::hours(12) + Duration::seconds(1));
    assert!(matches!(
        manager.valid_user_token("passwordless", &remembered, &users),
        Err(SecurityError::InvalidToken)
    ));
}

#[test]
fn test_unknown_purpose_uses_default_duration_and_signer() {
    let (manager, clock) = manager();
    let token = manager.generate_token("whatever", &["a", "b"]).unwrap();
    assert_eq!(manager.valid_token("default", &token).unwrap(), vec!["a", "b"]);

    clock.advance(Duration::minutes(61));
    assert!(manager.valid_token("whatever", &token).is_err());
}

#[test]
fn test_expiration_rendering() {
    let (manager, _) = manager();
    assert_eq!(
        manager.times().expiration("send_reset").unwrap(),
        "2023-11-17T10:13:20+0000"
    );
}

#[test]
fn test_construction_errors() {
    let bad_key = SecurityConfig::new("s").with_signatory(
        "send_reset",
        SignatoryConfig {
            encryption_key: Some("too-short".to_string()),
            ..SignatoryConfig::default()
        },
    );
    assert!(matches!(
        Manager::new(&bad_key, registry()),
        Err(SecurityError::Token(TokenError::Cipher(_)))
    ));

    let mut bad_alg = SecurityConfig::new("s");
    bad_alg.signing_method = "none".to_string();
    assert!(matches!(
        Manager::new(&bad_alg, registry()),
        Err(SecurityError::Token(TokenError::UnknownAlgorithm(_)))
    ));

    let mut bad_hash = SecurityConfig::new("s");
    bad_hash.hash_algorithm = "md5".to_string();
    assert!(matches!(
        Manager::new(&bad_hash, registry()),
        Err(SecurityError::Token(TokenError::HashUnavailable(_)))
    ));

    assert!(matches!(
        Manager::new(&SecurityConfig::new(""), registry()),
        Err(SecurityError::Config(_))
    ));
}

#[test]
fn test_duration_override_applies_to_valid_token() {
    let clock = Arc::new(ManualClock::new(start()));
    let config = SecurityConfig::new("s3cret").with_duration("send_confirm", "10s");
    let manager = Manager::with_clock(&config, registry(), clock.clone()).unwrap();

    let token = manager.generate_token("send_confirm", &["user-42"]).unwrap();
    clock.advance(Duration::seconds(10));
    assert!(manager.valid_token("send_confirm", &token).is_ok());
    clock.advance(Duration::seconds(1));
    assert!(manager.valid_token("send_confirm", &token).is_err());
}

proptest! {
    #[test]
    fn prop_packed_items_roundtrip(items in proptest::collection::vec("[^:]{0,16}", 1..5)) {
        let (manager, _) = manager();
        let token = manager.generate_token("send_reset", &items).unwrap();
        prop_assert_eq!(manager.valid_token("send_reset", &token).unwrap(), items);
    }

    #[test]
    fn prop_tampered_lease_is_rejected(index in any::<prop::sample::Index>()) {
        let (manager, _) = manager();
        let token = manager.issue("leased_token").unwrap();
        let mut bytes = token.into_bytes();
        let at = index.index(bytes.len());
        bytes[at] ^= 0x01;
        let tampered = String::from_utf8(bytes).unwrap();
        prop_assert!(!manager.redeem("leased_token", &tampered, Duration::hours(1)));
    }
}
