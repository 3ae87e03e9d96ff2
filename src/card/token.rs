//! Signed card token construction and verification.
//!
//! This module implements [RFC 7519](https://www.rfc-editor.org/rfc/rfc7519.html)
//! JSON Web Token generation for signed card payloads. The token carries the
//! ordered claim set from [`ClaimSet`](crate::card::ClaimSet) plus a
//! caller-supplied issued-at timestamp, and is signed with the algorithm the
//! key material was configured for.
//!
//! # Format
//!
//! Tokens have three parts separated by dots: `header.payload.signature`
//!
//! - Header: `{"alg":"<algorithm>","kid":"<thumbprint>","typ":"JWT"}`
//! - Payload: claims in insertion order, then `iat`
//! - Signature: computed over `base64url(header).base64url(payload)`
//!
//! All encodings are canonical and whitespace-free, and the issued-at is
//! caller-controlled, so signing is deterministic: identical claims, key, and
//! timestamp always produce byte-identical tokens.
//!
//! # Examples
//!
//! ```
//! use serde_json::json;
//! use signed_card_service::{
//!     card::{CardFields, CardToken, ClaimSet},
//!     keys::{KeyConfig, KeyProvider, SigningAlgorithm},
//! };
//!
//! # fn example() -> signed_card_service::error::Result<()> {
//! let provider = KeyProvider::new(KeyConfig::embedded(SigningAlgorithm::Rs256));
//! let key = provider.signing_key()?;
//!
//! let fields = CardFields::new(
//!     "a@x.com",
//!     "orig-1",
//!     vec!["b@x.com".to_owned()],
//!     json!({"type": "doc"}),
//! );
//! let claims = ClaimSet::build(&fields)?;
//!
//! let token = CardToken::sign(&claims, &key, 1_700_000_000)?;
//! assert!(token.token.starts_with("eyJ")); // JWT base64url format
//!
//! CardToken::verify(&token.token, &key)?;
//! # Ok(())
//! # }
//! ```

use crate::{
    card::claims::ClaimSet,
    error::{CardError, Result},
    keys::KeyMaterial,
};

/// A signed card token (JWT).
///
/// Immutable once constructed: the token string is the exact bytes that were
/// signed, ready to be bound into a template.
#[derive(Debug, Clone)]
pub struct CardToken {
    /// Complete JWT in the form `header.payload.signature`.
    pub token: String,

    /// Claims contained in the token, kept for convenience so callers do
    /// not need to decode the payload.
    pub claims: ClaimSet,
}

impl CardToken {
    /// Creates and signs a card token.
    ///
    /// The issued-at timestamp must be supplied by the caller; the signer
    /// never inserts a default time claim, which keeps output deterministic
    /// and testable. Signing is pure, synchronous, and single-attempt;
    /// failures are structural, never transient.
    ///
    /// # Errors
    ///
    /// - [`CardError::EncodingFailure`] if a claim value cannot be encoded
    /// - [`CardError::SigningFailure`] if the signature computation fails
    pub fn sign(claims: &ClaimSet, key: &KeyMaterial, issued_at: u64) -> Result<Self> {
        // JWT format: base64url(header).base64url(payload).base64url(signature)
        let header = serde_json::json!({
            "alg": key.algorithm().name(),
            "kid": key.kid(),
            "typ": "JWT"
        });
        let header_json = serde_json::to_string(&header)
            .map_err(|e| CardError::EncodingFailure(format!("token header: {e}")))?;
        let header_b64 = base64_url_encode(header_json.as_bytes());

        let payload_json = claims.to_payload_json(issued_at)?;
        let payload_b64 = base64_url_encode(payload_json.as_bytes());

        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature = key.sign(signing_input.as_bytes())?;
        let signature_b64 = base64_url_encode(&signature);

        Ok(Self { token: format!("{signing_input}.{signature_b64}"), claims: claims.clone() })
    }

    /// Verifies a token string against the public component of the key.
    ///
    /// Checks the three-part structure, that the header declares the key's
    /// algorithm, and that the signature matches `header.payload`. A
    /// tampered token yields an error, never a panic.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::VerificationFailure`] describing the first check
    /// that failed.
    pub fn verify(token: &str, key: &KeyMaterial) -> Result<()> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header_b64, payload_b64, signature_b64] = parts[..] else {
            return Err(CardError::VerificationFailure(
                "token must have exactly three dot-separated segments".to_owned(),
            ));
        };

        let header_bytes = base64_url_decode(header_b64, "header")?;
        let header: serde_json::Value = serde_json::from_slice(&header_bytes)
            .map_err(|e| CardError::VerificationFailure(format!("header is not JSON: {e}")))?;

        let declared_alg = header
            .get("alg")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| {
                CardError::VerificationFailure("header does not declare an algorithm".to_owned())
            })?;
        if declared_alg != key.algorithm().name() {
            return Err(CardError::VerificationFailure(format!(
                "token declares {declared_alg} but key material is {}",
                key.algorithm().name()
            )));
        }

        let signature = base64_url_decode(signature_b64, "signature")?;
        let signing_input = format!("{header_b64}.{payload_b64}");
        key.verify(signing_input.as_bytes(), &signature)
    }
}

/// Encodes bytes as base64url (RFC 4648) without padding.
///
/// JWT uses base64url encoding per RFC 7515 Section 2, which is URL-safe
/// and omits padding characters.
fn base64_url_encode(data: &[u8]) -> String {
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, data)
}

fn base64_url_decode(data: &str, segment: &str) -> Result<Vec<u8>> {
    base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, data)
        .map_err(|e| CardError::VerificationFailure(format!("{segment} is not base64url: {e}")))
}
