//! Integration tests for the signed card service.
//!
//! Tests the end-to-end flow from structured fields to a signed, templated
//! email body, plus the cross-component error paths.

use serde_json::json;
use signed_card_service::{
    card::{CardFields, CardToken, ClaimSet},
    error::CardError,
    keys::{KeyConfig, KeyProvider, SigningAlgorithm},
    service::CardService,
};

const T0: u64 = 1_700_000_000;

fn sample_fields() -> CardFields {
    CardFields::new("a@x.com", "orig-1", vec!["b@x.com".to_owned()], json!({"type": "doc"}))
}

#[test]
fn test_issue_signed_document_end_to_end() {
    let service = CardService::new(KeyConfig::embedded(SigningAlgorithm::Rs256));

    let body = service
        .issue_signed_document(&sample_fields(), "Token: {{signedCardPayload}}", T0)
        .expect("issuing should succeed");

    let token = body.strip_prefix("Token: ").expect("template prefix should be preserved");
    assert_eq!(
        token.split('.').count(),
        3,
        "token must have header, payload, and signature segments"
    );

    let repeat = service
        .issue_signed_document(&sample_fields(), "Token: {{signedCardPayload}}", T0)
        .expect("repeat issuing should succeed");
    assert_eq!(body, repeat, "identical input must yield the identical document");
}

#[test]
fn test_token_verifies_against_signing_key() {
    let provider = KeyProvider::new(KeyConfig::embedded(SigningAlgorithm::Rs256));
    let key = provider.signing_key().unwrap();

    let claims = ClaimSet::build(&sample_fields()).unwrap();
    let token = CardToken::sign(&claims, &key, T0).unwrap();

    assert!(CardToken::verify(&token.token, &key).is_ok());
}

#[test]
fn test_tampering_is_detected_not_fatal() {
    let service = CardService::new(KeyConfig::embedded(SigningAlgorithm::Rs256));
    let token = service.sign_card(&sample_fields(), T0).unwrap();

    let mut parts: Vec<String> = token.token.split('.').map(str::to_owned).collect();
    let mut payload = parts[1].clone().into_bytes();
    payload[3] = if payload[3] == b'x' { b'y' } else { b'x' };
    parts[1] = String::from_utf8(payload).unwrap();

    let result = service.verify_token(&parts.join("."));
    assert!(
        matches!(result, Err(CardError::VerificationFailure(_))),
        "tampered payload must fail verification as an error"
    );
}

#[test]
fn test_canonical_encoding_across_input_orderings() {
    let service = CardService::new(KeyConfig::embedded(SigningAlgorithm::Rs256));

    let mut a = sample_fields();
    a.card = serde_json::from_str(r#"{"type": "doc", "body": [{"b": 1, "a": 2}]}"#).unwrap();
    let mut b = sample_fields();
    b.card = serde_json::from_str(r#"{"body": [{"a": 2, "b": 1}], "type": "doc"}"#).unwrap();

    let token_a = service.sign_card(&a, T0).unwrap();
    let token_b = service.sign_card(&b, T0).unwrap();

    assert_eq!(token_a.token, token_b.token, "key order in input must not change the token");
}

#[test]
fn test_missing_placeholder_fails_closed() {
    let service = CardService::new(KeyConfig::embedded(SigningAlgorithm::Rs256));

    let result = service.issue_signed_document(
        &sample_fields(),
        "Body with {{signedCardPayload}} and {{unboundMarker}}",
        T0,
    );

    assert!(
        matches!(result, Err(CardError::MissingPlaceholder(ref name)) if name == "unboundMarker"),
        "unbound marker must be an error, not left in the output"
    );
}

#[test]
fn test_eddsa_configuration_end_to_end() {
    let service = CardService::new(KeyConfig::embedded(SigningAlgorithm::EdDsa));

    let body = service
        .issue_signed_document(&sample_fields(), "{{signedCardPayload}}", T0)
        .expect("EdDSA issuing should succeed");

    assert!(service.verify_token(&body).is_ok());
}

#[test]
fn test_explicit_expiration_flows_into_payload() {
    let service = CardService::new(KeyConfig::embedded(SigningAlgorithm::Rs256));
    let fields = sample_fields().with_expiration(T0 + 480);

    let token = service.sign_card(&fields, T0).unwrap();
    let payload_b64 = token.token.split('.').nth(1).unwrap();
    let payload_bytes = base64::Engine::decode(
        &base64::engine::general_purpose::URL_SAFE_NO_PAD,
        payload_b64,
    )
    .unwrap();
    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes).unwrap();

    assert_eq!(payload["exp"], json!(T0 + 480));
    assert_eq!(payload["iat"], json!(T0));
}

#[test]
fn test_vault_key_source_missing_secret() {
    let config = KeyConfig::from_toml(
        r#"
            source = "vault"
            secret = "DEFINITELY_UNSET_CARD_KEY_PEM"
            algorithm = "RS256"
        "#,
    )
    .unwrap();
    let service = CardService::new(config);

    let result = service.sign_card(&sample_fields(), T0);
    assert!(matches!(result, Err(CardError::KeyUnavailable(_))));
}
