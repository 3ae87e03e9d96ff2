//! Service facade for signing cards and rendering email bodies.
//!
//! [`CardService`] orchestrates the key provider, claims builder, token
//! signer, and template binder into two calls: sign a card into a token, and
//! bind the token into a template. Component errors propagate unchanged;
//! the facade never swallows, retries, or recovers silently.
//!
//! The service caches its key material after the first signing call, so a
//! single instance can be shared across threads; all other state is
//! per-call.
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
//! let service = CardService::new(KeyConfig::embedded(SigningAlgorithm::Rs256));
//!
//! let fields = CardFields::new(
//!     "service-account@contoso.com",
//!     "65c680ef-36a6-4a1b-b84c-a7b5c6198792",
//!     vec!["john@contoso.com".to_owned()],
//!     json!({"type": "AdaptiveCard", "version": "1.0"}),
//! );
//!
//! let body = service.issue_signed_document(
//!     &fields,
//!     "Token: {{signedCardPayload}}",
//!     1_700_000_000,
//! )?;
//! assert!(body.starts_with("Token: eyJ"));
//! # Ok(())
//! # }
//! ```

use tracing::{debug, instrument};

use crate::{
    card::{CardFields, CardToken, ClaimSet},
    error::Result,
    keys::{KeyConfig, KeyProvider},
    template::{bind, TemplateContext, SIGNED_CARD_PLACEHOLDER},
};

/// Signs card documents and binds them into email templates.
#[derive(Debug)]
pub struct CardService {
    provider: KeyProvider,
}

impl CardService {
    /// Creates a service for the given key configuration.
    ///
    /// Key material is loaded lazily on the first signing call and cached
    /// for the lifetime of the service.
    #[must_use]
    pub const fn new(config: KeyConfig) -> Self {
        Self { provider: KeyProvider::new(config) }
    }

    /// Returns the key provider backing this service.
    #[must_use]
    pub const fn key_provider(&self) -> &KeyProvider {
        &self.provider
    }

    /// Builds the claim set for the fields and signs it into a token.
    ///
    /// The issued-at timestamp is caller-supplied; signing identical fields
    /// with the same timestamp yields byte-identical tokens.
    ///
    /// # Errors
    ///
    /// Propagates [`CardError::KeyUnavailable`](crate::error::CardError::KeyUnavailable),
    /// [`CardError::InvalidClaim`](crate::error::CardError::InvalidClaim),
    /// [`CardError::EncodingFailure`](crate::error::CardError::EncodingFailure), and
    /// [`CardError::SigningFailure`](crate::error::CardError::SigningFailure)
    /// from the underlying components unchanged.
    #[instrument(skip(self, fields), fields(originator = %fields.originator, issued_at))]
    pub fn sign_card(&self, fields: &CardFields, issued_at: u64) -> Result<CardToken> {
        let claims = ClaimSet::build(fields)?;
        let key = self.provider.signing_key()?;
        let token = CardToken::sign(&claims, &key, issued_at)?;
        debug!(kid = %key.kid(), "card token signed");
        Ok(token)
    }

    /// Binds a signed token into a template at `{{signedCardPayload}}`.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::MissingPlaceholder`](crate::error::CardError::MissingPlaceholder)
    /// if the template contains a marker with no bound value, or
    /// [`CardError::EncodingFailure`](crate::error::CardError::EncodingFailure)
    /// if the token would corrupt the marker syntax.
    pub fn render_email_body(&self, template: &str, token: &CardToken) -> Result<String> {
        let mut context = TemplateContext::new();
        context.insert(SIGNED_CARD_PLACEHOLDER, &token.token)?;
        bind(template, &context)
    }

    /// Signs the fields and binds the token into the template in one call.
    ///
    /// The whole operation is synchronous and idempotent for identical
    /// inputs and a fixed `issued_at`: either a fully signed, fully bound
    /// document is returned, or an error and no partial output.
    ///
    /// # Errors
    ///
    /// Propagates the specific error kind of whichever component failed.
    #[instrument(skip(self, fields, template), fields(issued_at, template_len = template.len()))]
    pub fn issue_signed_document(
        &self,
        fields: &CardFields,
        template: &str,
        issued_at: u64,
    ) -> Result<String> {
        let token = self.sign_card(fields, issued_at)?;
        self.render_email_body(template, &token)
    }

    /// Verifies a token string against this service's key material.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::VerificationFailure`](crate::error::CardError::VerificationFailure)
    /// if the token is malformed or its signature does not match, or a key
    /// error if the key cannot be loaded.
    pub fn verify_token(&self, token: &str) -> Result<()> {
        let key = self.provider.signing_key()?;
        CardToken::verify(token, &key)
    }
}
