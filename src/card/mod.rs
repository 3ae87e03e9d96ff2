//! Card claim construction and token signing.
//!
//! This module turns a caller-supplied card document into a signed JWT
//! payload suitable for embedding in an Actionable Message email body.
//!
//! # Pipeline
//!
//! ```text
//! CardFields ──build──▶ ClaimSet ──sign──▶ CardToken
//!                                  ▲
//!                            KeyMaterial
//! ```
//!
//! - [`CardFields`]: raw structured input (sender, originator, recipients,
//!   card document, optional expiration)
//! - [`ClaimSet`]: ordered, validated claims with canonically encoded values
//! - [`CardToken`]: the signed `header.payload.signature` token
//!
//! # Determinism
//!
//! Everything in this module is deterministic: claim order is fixed,
//! structured values are canonically serialized, and the issued-at timestamp
//! is caller-supplied. Signing the same input twice yields identical bytes.
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
//!
//! let fields = CardFields::new(
//!     "service-account@contoso.com",
//!     "65c680ef-36a6-4a1b-b84c-a7b5c6198792",
//!     vec!["john@contoso.com".to_owned()],
//!     json!({"type": "AdaptiveCard", "version": "1.0"}),
//! );
//!
//! let key = provider.signing_key()?;
//! let claims = ClaimSet::build(&fields)?;
//! let token = CardToken::sign(&claims, &key, 1_700_000_000)?;
//!
//! assert_eq!(token.token.split('.').count(), 3);
//! # Ok(())
//! # }
//! ```

pub mod claims;
pub mod token;

pub use claims::{CardFields, ClaimSet};
pub use token::CardToken;
