//! Signed Card Service
//!
//! A library for deterministically signing structured claim sets into
//! verifiable JWT tokens and safely substituting them into text templates:
//! the core of producing an Actionable Message email body with a signed
//! Adaptive Card.
//!
//! # Overview
//!
//! The crate is organized as a small pipeline of independent components:
//!
//! - [`keys`]: supplies signing keys together with their algorithm metadata,
//!   abstracting the key source (embedded, file, vault)
//! - [`card::claims`]: assembles an ordered, validated claim set with
//!   canonically encoded values
//! - [`card::token`]: serializes and signs the claims into a
//!   `header.payload.signature` token
//! - [`template`]: binds the signed token into a template, failing closed on
//!   unmatched markers
//! - [`service`]: orchestrates the above behind a single facade
//!
//! Signing is deterministic by design: claim order is fixed, structured
//! values are canonically serialized, and the issued-at timestamp is always
//! caller-supplied (never a library default), so identical input produces
//! byte-identical output.
//!
//! # Examples
//!
//! ```
//! use serde_json::json;
//! use signed_card_service::{
//!     card::CardFields,
//!     keys::{KeyConfig, SigningAlgorithm},
//!     service::CardService,
//! };
//!
//! # fn example() -> signed_card_service::error::Result<()> {
//! // Development key pair; production loads a registered key from a file
//! // or secret mount
//! let service = CardService::new(KeyConfig::embedded(SigningAlgorithm::Rs256));
//!
//! let fields = CardFields::new(
//!     "service-account@contoso.com",
//!     "65c680ef-36a6-4a1b-b84c-a7b5c6198792",
//!     vec!["john@contoso.com".to_owned(), "jane@contoso.com".to_owned()],
//!     json!({"type": "AdaptiveCard", "version": "1.0", "body": []}),
//! );
//!
//! let email_body = service.issue_signed_document(
//!     &fields,
//!     r#"<script type="application/adaptivecard+json">{{signedCardPayload}}</script>"#,
//!     1_700_000_000,
//! )?;
//!
//! assert!(email_body.contains("eyJ"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod card;
pub mod error;
pub mod keys;
pub mod service;
pub mod template;

pub use card::{CardFields, CardToken, ClaimSet};
pub use error::{CardError, Result};
pub use keys::{KeyConfig, KeyProvider, SigningAlgorithm};
pub use service::CardService;
pub use template::SIGNED_CARD_PLACEHOLDER;
