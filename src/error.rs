//! Error types for the signed card service.
//!
//! This module defines all error types that can occur while building, signing,
//! or templating a card token. All errors implement the standard
//! [`std::error::Error`] trait via [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Key errors** ([`CardError::KeyUnavailable`], [`CardError::SigningFailure`]):
//!   key source or key/algorithm configuration problems
//! - **Input errors** ([`CardError::InvalidClaim`], [`CardError::EncodingFailure`]):
//!   bad caller input, reported with the failing field
//! - **Template errors** ([`CardError::MissingPlaceholder`]): template/context mismatch
//! - **Verification errors** ([`CardError::VerificationFailure`]): token structure
//!   or signature check failed
//!
//! None of these are transient: there are no retries anywhere in the crate.
//! Either a fully signed, fully bound document is produced, or an error is
//! returned and no partial output is emitted.
//!
//! # Examples
//!
//! ```
//! use signed_card_service::error::{CardError, Result};
//!
//! fn require_sender(sender: &str) -> Result<()> {
//!     if sender.is_empty() {
//!         return Err(CardError::InvalidClaim("sender must not be empty".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Result type alias for card service operations.
///
/// This is a convenience type that uses [`CardError`] as the error type.
/// All fallible functions in this crate return this type.
pub type Result<T> = std::result::Result<T, CardError>;

/// Errors that can occur while signing and templating card tokens.
///
/// All variants include contextual information identifying the failing
/// field, key source, or placeholder. Errors are surfaced to the caller
/// unchanged; the service never swallows or silently recovers from them.
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum CardError {
    /// The configured key source is missing, malformed, or inaccessible.
    ///
    /// Common causes include:
    /// - Key file not found or unreadable
    /// - Secret environment variable not set
    /// - PEM data that is not a private key
    ///
    /// This is fatal for the current configuration and is never retried.
    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),

    /// A claim field is absent, empty, or duplicated.
    ///
    /// The message names the offending claim so callers can fix their input.
    #[error("invalid claim: {0}")]
    InvalidClaim(String),

    /// A claim value could not be canonically encoded.
    ///
    /// Raised when serialization of a structured sub-value (such as the card
    /// document or recipient list) fails, or when a substitution value would
    /// corrupt the template marker syntax.
    #[error("canonical encoding failed: {0}")]
    EncodingFailure(String),

    /// Token signing failed.
    ///
    /// Indicates the key material is incompatible with the declared algorithm
    /// (for example an Ed25519 key configured for RS256), or the underlying
    /// signature computation rejected the input. This is a configuration
    /// error, not a transient condition.
    #[error("token signing failed: {0}")]
    SigningFailure(String),

    /// A template marker has no matching context entry.
    ///
    /// Binding fails closed rather than leaving the marker in place, so a
    /// half-substituted document can never reach recipients. The message
    /// names the unmatched placeholder.
    #[error("template placeholder has no bound value: {0}")]
    MissingPlaceholder(String),

    /// Token verification failed.
    ///
    /// The token is structurally invalid, declares a different algorithm
    /// than the key material, or its signature does not match the payload
    /// (tampering). Verification failures are ordinary errors, never panics.
    #[error("token verification failed: {0}")]
    VerificationFailure(String),
}
