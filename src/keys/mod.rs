//! Signing key configuration and retrieval.
//!
//! The key provider supplies [`KeyMaterial`], a signing key together with its
//! algorithm metadata, so the token signer never has to guess whether a key
//! and an algorithm are compatible. The key source is abstracted behind
//! [`KeySource`]:
//!
//! - **Embedded**: development key pair baked into the crate, valid only for
//!   self-sending scenarios
//! - **File**: PKCS#8 private key PEM on disk
//! - **Vault**: PEM delivered through the process environment by the
//!   deployment's secret mount
//!
//! Key material is loaded at most once per [`KeyProvider`] and cached behind a
//! single-writer lock; the cached [`KeyMaterial`] is immutable, so concurrent
//! signing calls share it freely.
//!
//! # Key Identification
//!
//! Each key carries an [RFC 7638](https://www.rfc-editor.org/rfc/rfc7638.html)
//! JWK thumbprint as its `kid`, computed over the canonical public JWK members
//! (`e`/`kty`/`n` for RSA, `crv`/`kty`/`x` for Ed25519).
//!
//! # Examples
//!
//! ```
//! use signed_card_service::keys::{KeyConfig, KeyProvider, SigningAlgorithm};
//!
//! # fn example() -> signed_card_service::error::Result<()> {
//! let config = KeyConfig::embedded(SigningAlgorithm::Rs256);
//! let provider = KeyProvider::new(config);
//!
//! let key = provider.signing_key()?;
//! assert_eq!(key.algorithm(), SigningAlgorithm::Rs256);
//! assert!(!key.kid().is_empty());
//! # Ok(())
//! # }
//! ```

mod embedded;

use std::{
    env, fs,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use josekit::{
    jwk::Jwk,
    jws::{EdDSA, JwsSigner, JwsVerifier, RS256, RS384, RS512},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use zeroize::Zeroize;

use crate::error::{CardError, Result};

/// Asymmetric signature algorithm for token signing.
///
/// The algorithm names follow the JWS `alg` header registry. RS256 is the
/// algorithm the Actionable Message provider expects; the remaining variants
/// exist for algorithm agility without code changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SigningAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    #[serde(rename = "RS256")]
    Rs256,
    /// RSASSA-PKCS1-v1_5 with SHA-384.
    #[serde(rename = "RS384")]
    Rs384,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    #[serde(rename = "RS512")]
    Rs512,
    /// Edwards-curve digital signature with Ed25519.
    #[serde(rename = "EdDSA")]
    EdDsa,
}

impl SigningAlgorithm {
    /// Returns the JWS `alg` header value for this algorithm.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::EdDsa => "EdDSA",
        }
    }

    /// Returns true if this algorithm expects RSA key material.
    const fn is_rsa(&self) -> bool {
        matches!(self, Self::Rs256 | Self::Rs384 | Self::Rs512)
    }
}

/// Source of the signing key material.
///
/// Deserialized from the `source` field of a [`KeyConfig`] document, with
/// source-specific parameters alongside it.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum KeySource {
    /// Development key pair embedded in the crate (self-sending only).
    Embedded,
    /// PKCS#8 private key PEM read from disk.
    File {
        /// Path to the PEM file.
        path: PathBuf,
    },
    /// PKCS#8 private key PEM delivered through the process environment,
    /// as populated by the deployment's secret mount.
    Vault {
        /// Name of the environment variable holding the PEM.
        secret: String,
    },
}

/// Key provider configuration.
///
/// Identifies the key source and the signature algorithm together, so a key
/// can never be paired with an algorithm it was not configured for.
///
/// # Examples
///
/// ```
/// use signed_card_service::keys::{KeyConfig, SigningAlgorithm};
///
/// let toml = r#"
///     source = "file"
///     path = "/etc/card-service/signing-key.pem"
///     algorithm = "RS256"
/// "#;
///
/// let config = KeyConfig::from_toml(toml).unwrap();
/// assert_eq!(config.algorithm, SigningAlgorithm::Rs256);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct KeyConfig {
    /// Where the private key comes from.
    #[serde(flatten)]
    pub source: KeySource,

    /// Signature algorithm the key will be used with.
    pub algorithm: SigningAlgorithm,
}

impl KeyConfig {
    /// Creates a configuration using the embedded development key pair.
    #[must_use]
    pub const fn embedded(algorithm: SigningAlgorithm) -> Self {
        Self { source: KeySource::Embedded, algorithm }
    }

    /// Parses a configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::KeyUnavailable`] if the document does not
    /// describe a recognized key source and algorithm.
    pub fn from_toml(toml: &str) -> Result<Self> {
        toml::from_str(toml)
            .map_err(|e| CardError::KeyUnavailable(format!("invalid key configuration: {e}")))
    }
}

/// Immutable signing key material.
///
/// Pairs the cryptographic key handle with its algorithm and RFC 7638
/// thumbprint. Once constructed the material never changes, so it is safe to
/// share across threads behind an [`Arc`]. The private key bytes are owned by
/// the underlying JWS signer and are never logged or exposed.
#[derive(Clone)]
pub struct KeyMaterial {
    algorithm: SigningAlgorithm,
    kid: String,
    signer: Box<dyn JwsSigner>,
    verifier: Box<dyn JwsVerifier>,
}

impl std::fmt::Debug for KeyMaterial {
    // Key handles stay out of Debug output
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.algorithm)
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

impl KeyMaterial {
    /// Builds key material from a PKCS#8 private key PEM.
    ///
    /// The public component used for verification and the `kid` thumbprint
    /// are derived from the same PEM, so a token signed with this material
    /// always verifies against it.
    ///
    /// # Errors
    ///
    /// - [`CardError::KeyUnavailable`] if the PEM is not parseable key material
    /// - [`CardError::SigningFailure`] if the key type does not match the
    ///   declared algorithm (for example an Ed25519 key configured for RS256)
    pub fn from_private_pem(algorithm: SigningAlgorithm, pem: &[u8]) -> Result<Self> {
        let (signer, verifier, public_jwk): (Box<dyn JwsSigner>, Box<dyn JwsVerifier>, Jwk) =
            match algorithm {
                SigningAlgorithm::Rs256 | SigningAlgorithm::Rs384 | SigningAlgorithm::Rs512 => {
                    let alg = match algorithm {
                        SigningAlgorithm::Rs256 => RS256,
                        SigningAlgorithm::Rs384 => RS384,
                        _ => RS512,
                    };
                    let key_pair = alg
                        .key_pair_from_pem(pem)
                        .map_err(|e| classify_key_error(algorithm, pem, &e))?;
                    let signer = alg
                        .signer_from_pem(pem)
                        .map_err(|e| CardError::KeyUnavailable(e.to_string()))?;
                    let jwk = key_pair.to_jwk_public_key();
                    let verifier = alg
                        .verifier_from_jwk(&jwk)
                        .map_err(|e| CardError::KeyUnavailable(e.to_string()))?;
                    (Box::new(signer), Box::new(verifier), jwk)
                }
                SigningAlgorithm::EdDsa => {
                    let key_pair = EdDSA
                        .key_pair_from_pem(pem)
                        .map_err(|e| classify_key_error(algorithm, pem, &e))?;
                    let signer = EdDSA
                        .signer_from_pem(pem)
                        .map_err(|e| CardError::KeyUnavailable(e.to_string()))?;
                    let jwk = key_pair.to_jwk_public_key();
                    let verifier = EdDSA
                        .verifier_from_jwk(&jwk)
                        .map_err(|e| CardError::KeyUnavailable(e.to_string()))?;
                    (Box::new(signer), Box::new(verifier), jwk)
                }
            };

        let kid = compute_thumbprint(&public_jwk)?;

        Ok(Self { algorithm, kid, signer, verifier })
    }

    /// Returns the signature algorithm this key is bound to.
    #[must_use]
    pub const fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Returns the RFC 7638 JWK thumbprint identifying this key.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Signs a message with the private key.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::SigningFailure`] if the underlying signature
    /// computation fails.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.signer
            .sign(message)
            .map_err(|e| CardError::SigningFailure(e.to_string()))
    }

    /// Verifies a signature against the public component of this key.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::VerificationFailure`] if the signature does not
    /// match the message.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        self.verifier
            .verify(message, signature)
            .map_err(|e| CardError::VerificationFailure(e.to_string()))
    }
}

/// Retrieves and caches signing key material.
///
/// The first call to [`signing_key`](Self::signing_key) loads the key from
/// the configured source; subsequent calls return the cached material. The
/// load-and-cache transition is guarded by a mutex so concurrent first use
/// cannot load the key twice.
#[derive(Debug)]
pub struct KeyProvider {
    config: KeyConfig,
    cached: Mutex<Option<Arc<KeyMaterial>>>,
}

impl KeyProvider {
    /// Creates a provider for the given configuration.
    ///
    /// No I/O happens here; the key is fetched lazily on first use.
    #[must_use]
    pub const fn new(config: KeyConfig) -> Self {
        Self { config, cached: Mutex::new(None) }
    }

    /// Returns the configuration this provider was created with.
    #[must_use]
    pub const fn config(&self) -> &KeyConfig {
        &self.config
    }

    /// Returns the signing key, loading it on first use.
    ///
    /// # Errors
    ///
    /// - [`CardError::KeyUnavailable`] if the key source is missing,
    ///   malformed, or inaccessible
    /// - [`CardError::SigningFailure`] if the key material does not match
    ///   the configured algorithm
    #[instrument(skip(self), fields(algorithm = self.config.algorithm.name()))]
    pub fn signing_key(&self) -> Result<Arc<KeyMaterial>> {
        let mut guard = self
            .cached
            .lock()
            .map_err(|_| CardError::KeyUnavailable("key cache lock poisoned".to_owned()))?;

        if let Some(material) = guard.as_ref() {
            return Ok(Arc::clone(material));
        }

        let material = Arc::new(self.load()?);
        debug!(kid = %material.kid(), "signing key loaded");
        *guard = Some(Arc::clone(&material));
        Ok(material)
    }

    /// Loads key material from the configured source.
    fn load(&self) -> Result<KeyMaterial> {
        match &self.config.source {
            KeySource::Embedded => {
                let pem = if self.config.algorithm.is_rsa() {
                    embedded::DEV_RSA_PRIVATE_KEY_PEM
                } else {
                    embedded::DEV_ED25519_PRIVATE_KEY_PEM
                };
                KeyMaterial::from_private_pem(self.config.algorithm, pem.as_bytes())
            }
            KeySource::File { path } => {
                let mut pem = fs::read(path).map_err(|e| {
                    CardError::KeyUnavailable(format!(
                        "cannot read key file {}: {e}",
                        path.display()
                    ))
                })?;
                let material = KeyMaterial::from_private_pem(self.config.algorithm, &pem);
                pem.zeroize();
                material
            }
            KeySource::Vault { secret } => {
                let mut pem = env::var(secret).map_err(|_| {
                    CardError::KeyUnavailable(format!("secret {secret} is not set"))
                })?;
                let material = KeyMaterial::from_private_pem(self.config.algorithm, pem.as_bytes());
                pem.zeroize();
                material
            }
        }
    }
}

/// Distinguishes malformed key material from an algorithm/key-type mismatch.
///
/// A PEM that parses under the other key family is a misconfiguration
/// (`SigningFailure`); anything else is unusable material (`KeyUnavailable`).
fn classify_key_error(
    algorithm: SigningAlgorithm,
    pem: &[u8],
    error: &josekit::JoseError,
) -> CardError {
    let other_family_parses = if algorithm.is_rsa() {
        EdDSA.key_pair_from_pem(pem).is_ok()
    } else {
        RS256.key_pair_from_pem(pem).is_ok()
    };

    if other_family_parses {
        CardError::SigningFailure(format!(
            "key material is incompatible with {}",
            algorithm.name()
        ))
    } else {
        CardError::KeyUnavailable(format!("invalid key material: {error}"))
    }
}

/// Computes the RFC 7638 JWK thumbprint over the canonical public members.
fn compute_thumbprint(jwk: &Jwk) -> Result<String> {
    // Canonical member order per RFC 7638 section 3.2
    let canonical = match jwk.key_type() {
        "RSA" => format!(
            r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#,
            jwk_param(jwk, "e")?,
            jwk_param(jwk, "n")?
        ),
        "OKP" => format!(
            r#"{{"crv":"{}","kty":"OKP","x":"{}"}}"#,
            jwk_param(jwk, "crv")?,
            jwk_param(jwk, "x")?
        ),
        other => {
            return Err(CardError::KeyUnavailable(format!("unsupported key type: {other}")));
        }
    };

    let hash = Sha256::digest(canonical.as_bytes());
    Ok(base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, hash))
}

fn jwk_param<'a>(jwk: &'a Jwk, name: &str) -> Result<&'a str> {
    jwk.parameter(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| CardError::KeyUnavailable(format!("public JWK missing {name}")))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_embedded_rsa_key_loads() {
        let provider = KeyProvider::new(KeyConfig::embedded(SigningAlgorithm::Rs256));
        let key = provider.signing_key().expect("embedded key should load");

        assert_eq!(key.algorithm(), SigningAlgorithm::Rs256);
        assert_eq!(key.kid().len(), 43, "base64url SHA-256 thumbprint is 43 chars");
    }

    #[test]
    fn test_embedded_ed25519_key_loads() {
        let provider = KeyProvider::new(KeyConfig::embedded(SigningAlgorithm::EdDsa));
        let key = provider.signing_key().expect("embedded key should load");

        assert_eq!(key.algorithm(), SigningAlgorithm::EdDsa);
    }

    #[test]
    fn test_key_is_cached_across_calls() {
        let provider = KeyProvider::new(KeyConfig::embedded(SigningAlgorithm::Rs256));

        let key1 = provider.signing_key().unwrap();
        let key2 = provider.signing_key().unwrap();

        assert!(Arc::ptr_eq(&key1, &key2), "second call must return the cached material");
    }

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let provider = KeyProvider::new(KeyConfig::embedded(SigningAlgorithm::Rs256));
        let key = provider.signing_key().unwrap();

        let signature = key.sign(b"message").unwrap();
        assert!(key.verify(b"message", &signature).is_ok());
        assert!(matches!(
            key.verify(b"other message", &signature),
            Err(CardError::VerificationFailure(_))
        ));
    }

    #[test]
    fn test_missing_key_file() {
        let config = KeyConfig {
            source: KeySource::File { path: PathBuf::from("/nonexistent/key.pem") },
            algorithm: SigningAlgorithm::Rs256,
        };
        let provider = KeyProvider::new(config);

        let result = provider.signing_key();
        assert!(matches!(result, Err(CardError::KeyUnavailable(_))));
    }

    #[test]
    fn test_key_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(embedded::DEV_RSA_PRIVATE_KEY_PEM.as_bytes()).unwrap();

        let config = KeyConfig {
            source: KeySource::File { path: file.path().to_path_buf() },
            algorithm: SigningAlgorithm::Rs256,
        };
        let provider = KeyProvider::new(config);

        assert!(provider.signing_key().is_ok());
    }

    #[test]
    fn test_algorithm_key_mismatch_is_signing_failure() {
        // Ed25519 PEM configured for RS256 is a misconfiguration, not a
        // missing key
        let result = KeyMaterial::from_private_pem(
            SigningAlgorithm::Rs256,
            embedded::DEV_ED25519_PRIVATE_KEY_PEM.as_bytes(),
        );

        assert!(matches!(result, Err(CardError::SigningFailure(_))));
    }

    #[test]
    fn test_garbage_pem_is_key_unavailable() {
        let result =
            KeyMaterial::from_private_pem(SigningAlgorithm::Rs256, b"not a pem at all");

        assert!(matches!(result, Err(CardError::KeyUnavailable(_))));
    }

    #[test]
    fn test_config_from_toml_embedded() {
        let config = KeyConfig::from_toml(
            r#"
                source = "embedded"
                algorithm = "RS256"
            "#,
        )
        .unwrap();

        assert!(matches!(config.source, KeySource::Embedded));
        assert_eq!(config.algorithm, SigningAlgorithm::Rs256);
    }

    #[test]
    fn test_config_from_toml_vault() {
        let config = KeyConfig::from_toml(
            r#"
                source = "vault"
                secret = "CARD_SIGNING_KEY_PEM"
                algorithm = "EdDSA"
            "#,
        )
        .unwrap();

        match config.source {
            KeySource::Vault { ref secret } => assert_eq!(secret, "CARD_SIGNING_KEY_PEM"),
            ref other => panic!("expected vault source, got {other:?}"),
        }
        assert_eq!(config.algorithm, SigningAlgorithm::EdDsa);
    }

    #[test]
    fn test_config_rejects_unknown_algorithm() {
        let result = KeyConfig::from_toml(
            r#"
                source = "embedded"
                algorithm = "HS256"
            "#,
        );

        assert!(matches!(result, Err(CardError::KeyUnavailable(_))));
    }

    #[test]
    fn test_rsa_and_ed25519_thumbprints_differ() {
        let rsa = KeyMaterial::from_private_pem(
            SigningAlgorithm::Rs256,
            embedded::DEV_RSA_PRIVATE_KEY_PEM.as_bytes(),
        )
        .unwrap();
        let ed = KeyMaterial::from_private_pem(
            SigningAlgorithm::EdDsa,
            embedded::DEV_ED25519_PRIVATE_KEY_PEM.as_bytes(),
        )
        .unwrap();

        assert_ne!(rsa.kid(), ed.kid());
    }
}
