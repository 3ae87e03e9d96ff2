//! Claim set construction and canonical encoding.
//!
//! The claims builder turns caller-supplied [`CardFields`] into an ordered
//! [`ClaimSet`] whose values are already in their final encodable form.
//! Structured sub-values (the recipient list and the card document) are
//! canonically serialized into single string claims, so repeated builds over
//! semantically equal input produce byte-identical output.
//!
//! # Claim Layout
//!
//! The claim names and their order match what the Actionable Message provider
//! expects in the token payload:
//!
//! - `sender`: email address the message is sent from
//! - `originator`: provider ID issued during registration
//! - `recipientsSerialized`: JSON array of recipient addresses, as a string
//! - `adaptiveCardSerialized`: minified card document, as a string
//! - `exp`: expiration timestamp, only when explicitly supplied
//!
//! # Examples
//!
//! ```
//! use serde_json::json;
//! use signed_card_service::card::{CardFields, ClaimSet};
//!
//! # fn example() -> signed_card_service::error::Result<()> {
//! let fields = CardFields::new(
//!     "service-account@contoso.com",
//!     "65c680ef-36a6-4a1b-b84c-a7b5c6198792",
//!     vec!["john@contoso.com".to_owned(), "jane@contoso.com".to_owned()],
//!     json!({"type": "AdaptiveCard", "version": "1.0"}),
//! );
//!
//! let claims = ClaimSet::build(&fields)?;
//! assert_eq!(claims.len(), 4);
//! # Ok(())
//! # }
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CardError, Result};

/// Claim name for the sending account.
pub const CLAIM_SENDER: &str = "sender";
/// Claim name for the registered provider ID.
pub const CLAIM_ORIGINATOR: &str = "originator";
/// Claim name for the serialized recipient list.
pub const CLAIM_RECIPIENTS: &str = "recipientsSerialized";
/// Claim name for the serialized card document.
pub const CLAIM_CARD: &str = "adaptiveCardSerialized";
/// Claim name for the explicit expiration timestamp.
pub const CLAIM_EXPIRATION: &str = "exp";

/// Issued-at is appended by the token signer; callers cannot claim it.
const RESERVED_CLAIMS: &[&str] = &["iat"];

/// Caller-supplied input for a signed card.
///
/// Loading this data from a file or the command line is the caller's
/// concern; the builder only validates and encodes it.
#[derive(Debug, Clone, Deserialize)]
pub struct CardFields {
    /// Sender of the email.
    pub sender: String,

    /// Provider ID generated during provider registration.
    pub originator: String,

    /// Recipients of the email.
    pub recipients: Vec<String>,

    /// The card document to embed, as arbitrary JSON.
    pub card: Value,

    /// Explicit expiration timestamp (Unix seconds).
    ///
    /// Expiration is never inferred; it appears in the token only when the
    /// caller supplies it here.
    #[serde(default)]
    pub expires_at: Option<u64>,
}

impl CardFields {
    /// Creates card fields without an expiration.
    #[must_use]
    pub fn new(sender: &str, originator: &str, recipients: Vec<String>, card: Value) -> Self {
        Self {
            sender: sender.to_owned(),
            originator: originator.to_owned(),
            recipients,
            card,
            expires_at: None,
        }
    }

    /// Sets an explicit expiration timestamp (Unix seconds).
    #[must_use]
    pub const fn with_expiration(mut self, expires_at: u64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Ordered set of named claims, values in final encodable form.
///
/// Claim names are unique; insertion order is the order the claims appear in
/// the signed payload. A claim set is created per signing request and
/// discarded after use.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClaimSet {
    claims: Vec<(String, Value)>,
}

impl ClaimSet {
    /// Creates an empty claim set.
    #[must_use]
    pub const fn new() -> Self {
        Self { claims: Vec::new() }
    }

    /// Builds the claim set for a signed card.
    ///
    /// Validates the required fields and canonically serializes the
    /// structured sub-values into string claims.
    ///
    /// # Errors
    ///
    /// - [`CardError::InvalidClaim`] if a required field is absent or empty
    /// - [`CardError::EncodingFailure`] if a sub-value cannot be canonically
    ///   serialized
    pub fn build(fields: &CardFields) -> Result<Self> {
        if fields.sender.is_empty() {
            return Err(CardError::InvalidClaim("sender must not be empty".to_owned()));
        }
        if fields.originator.is_empty() {
            return Err(CardError::InvalidClaim("originator must not be empty".to_owned()));
        }
        if fields.recipients.is_empty() {
            return Err(CardError::InvalidClaim("recipients must not be empty".to_owned()));
        }
        if fields.recipients.iter().any(String::is_empty) {
            return Err(CardError::InvalidClaim(
                "recipients must not contain empty addresses".to_owned(),
            ));
        }

        let recipients_value =
            Value::Array(fields.recipients.iter().cloned().map(Value::String).collect());
        let recipients_serialized = canonical_json(&recipients_value)
            .map_err(|e| prefix_field(CLAIM_RECIPIENTS, e))?;
        let card_serialized =
            canonical_json(&fields.card).map_err(|e| prefix_field(CLAIM_CARD, e))?;

        let mut claims = Self::new();
        claims.insert(CLAIM_SENDER, Value::String(fields.sender.clone()))?;
        claims.insert(CLAIM_ORIGINATOR, Value::String(fields.originator.clone()))?;
        claims.insert(CLAIM_RECIPIENTS, Value::String(recipients_serialized))?;
        claims.insert(CLAIM_CARD, Value::String(card_serialized))?;
        if let Some(expires_at) = fields.expires_at {
            claims.insert(CLAIM_EXPIRATION, Value::from(expires_at))?;
        }

        Ok(claims)
    }

    /// Inserts a claim, preserving insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::InvalidClaim`] if the name is already present or
    /// is reserved for the token signer (`iat`).
    pub fn insert(&mut self, name: &str, value: Value) -> Result<()> {
        if RESERVED_CLAIMS.contains(&name) {
            return Err(CardError::InvalidClaim(format!("claim name {name} is reserved")));
        }
        if self.claims.iter().any(|(existing, _)| existing == name) {
            return Err(CardError::InvalidClaim(format!("duplicate claim name: {name}")));
        }
        self.claims.push((name.to_owned(), value));
        Ok(())
    }

    /// Returns the value of a claim, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.iter().find(|(existing, _)| existing == name).map(|(_, value)| value)
    }

    /// Number of claims in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Returns true if the set has no claims.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Iterates the claims in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.claims.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Renders the payload JSON: claims in insertion order, then `iat`.
    ///
    /// The issued-at timestamp is caller-controlled, never a library
    /// default, so identical input always yields identical payload bytes.
    pub(crate) fn to_payload_json(&self, issued_at: u64) -> Result<String> {
        let mut out = String::from("{");
        for (name, value) in &self.claims {
            push_member(&mut out, name, value)?;
            out.push(',');
        }
        push_member(&mut out, "iat", &Value::from(issued_at))?;
        out.push('}');
        Ok(out)
    }
}

fn push_member(out: &mut String, name: &str, value: &Value) -> Result<()> {
    let encoded_name = serde_json::to_string(name)
        .map_err(|e| CardError::EncodingFailure(format!("claim name {name}: {e}")))?;
    out.push_str(&encoded_name);
    out.push(':');
    out.push_str(&canonical_json(value)?);
    Ok(())
}

fn prefix_field(field: &str, error: CardError) -> CardError {
    match error {
        CardError::EncodingFailure(msg) => CardError::EncodingFailure(format!("{field}: {msg}")),
        other => other,
    }
}

/// Serializes a JSON value canonically: no whitespace, object keys sorted.
///
/// Semantically equal documents that differ only in key order or formatting
/// produce identical bytes, which keeps the signed payload deterministic.
///
/// # Errors
///
/// Returns [`CardError::EncodingFailure`] if a scalar cannot be serialized.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use signed_card_service::card::claims::canonical_json;
///
/// let a = canonical_json(&json!({"b": 1, "a": [1, 2]})).unwrap();
/// let b = canonical_json(&json!({"a": [1, 2], "b": 1})).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a, r#"{"a":[1,2],"b":1}"#);
/// ```
pub fn canonical_json(value: &Value) -> Result<String> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let encoded_key = serde_json::to_string(key)
                    .map_err(|e| CardError::EncodingFailure(format!("object key {key}: {e}")))?;
                out.push_str(&encoded_key);
                out.push(':');
                write_canonical(&map[key.as_str()], out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => {
            let encoded = serde_json::to_string(scalar)
                .map_err(|e| CardError::EncodingFailure(e.to_string()))?;
            out.push_str(&encoded);
        }
    }
    Ok(())
}
