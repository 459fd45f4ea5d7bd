//! Signature verification for compact tokens
//!
//! The verifiers here check the signature segment only. Expiry, issuer and
//! audience belong to [`crate::auth::claims::validate`], so every
//! `jsonwebtoken` claim check is switched off.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;

use crate::error::{GateError, Result};

/// Checks the signature of a compact token before its claims are trusted
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<()>;
}

fn signature_only(algorithm: Algorithm) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation
}

fn verify_with_key(token: &str, key: &DecodingKey, algorithm: Algorithm) -> Result<()> {
    decode::<Value>(token, key, &signature_only(algorithm))
        .map(|_| ())
        .map_err(|e| GateError::Signature(e.to_string()))
}

/// Verifies against one locally configured key
pub struct StaticKeyVerifier {
    key: DecodingKey,
    algorithm: Algorithm,
}

impl StaticKeyVerifier {
    pub fn new(key: DecodingKey, algorithm: Algorithm) -> Self {
        Self { key, algorithm }
    }

    /// HS256 shared-secret verifier
    pub fn hmac(secret: &[u8]) -> Self {
        Self::new(DecodingKey::from_secret(secret), Algorithm::HS256)
    }
}

#[async_trait]
impl SignatureVerifier for StaticKeyVerifier {
    async fn verify(&self, token: &str) -> Result<()> {
        verify_with_key(token, &self.key, self.algorithm)
    }
}

#[cfg(feature = "jwks")]
pub use jwks::{jwk_algorithm_to_algorithm, parse_jwk_set, JwksVerifier};

#[cfg(feature = "jwks")]
mod jwks {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    use async_trait::async_trait;
    use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet};
    use jsonwebtoken::{decode_header, Algorithm, DecodingKey};
    use reqwest::Client;
    use tokio::sync::RwLock;

    use super::{verify_with_key, SignatureVerifier};
    use crate::error::{GateError, Result};

    type KeyMap = HashMap<String, (DecodingKey, Algorithm)>;

    const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(3600);

    /// Map a JWK's key parameters to the algorithm used to verify with it
    pub fn jwk_algorithm_to_algorithm(jwk: &Jwk) -> Result<Algorithm> {
        match &jwk.algorithm {
            AlgorithmParameters::RSA(_) => Ok(Algorithm::RS256),
            AlgorithmParameters::EllipticCurve(params) => match &params.curve {
                EllipticCurve::P256 => Ok(Algorithm::ES256),
                EllipticCurve::P384 => Ok(Algorithm::ES384),
                other => Err(GateError::Signature(format!(
                    "Unsupported elliptic curve for JWK: {:?}",
                    other
                ))),
            },
            AlgorithmParameters::OctetKey(_) => Err(GateError::Signature(
                "HMAC keys are not accepted from a JWKS".to_string(),
            )),
            AlgorithmParameters::OctetKeyPair(_) => Ok(Algorithm::EdDSA),
        }
    }

    /// Keys of a JWK set indexed by `kid`; unusable keys are skipped
    pub fn parse_jwk_set(jwk_set: &JwkSet) -> KeyMap {
        let mut keys = HashMap::new();
        for jwk in &jwk_set.keys {
            let Some(kid) = &jwk.common.key_id else {
                tracing::warn!("JWK missing kid field, skipping");
                continue;
            };
            let decoding_key = match DecodingKey::from_jwk(jwk) {
                Ok(key) => key,
                Err(err) => {
                    tracing::warn!("Failed to create decoding key for kid {}: {}", kid, err);
                    continue;
                }
            };
            match jwk_algorithm_to_algorithm(jwk) {
                Ok(algorithm) => {
                    tracing::debug!("Loaded key {}: algorithm={:?}", kid, algorithm);
                    keys.insert(kid.clone(), (decoding_key, algorithm));
                }
                Err(e) => tracing::warn!("Unsupported algorithm for kid {}: {}", kid, e),
            }
        }
        keys
    }

    struct CachedKeys {
        keys: KeyMap,
        fetched_at: SystemTime,
    }

    /// Verifies against keys published at a JWKS endpoint
    ///
    /// Keys are cached and refetched once the cache duration has elapsed. A
    /// fetch failure fails the verification; it is not retried.
    #[derive(Clone)]
    pub struct JwksVerifier {
        http_client: Client,
        jwks_uri: String,
        cache_duration: Duration,
        cache: Arc<RwLock<Option<CachedKeys>>>,
    }

    impl JwksVerifier {
        pub fn new(jwks_uri: impl Into<String>) -> Self {
            Self {
                http_client: Client::new(),
                jwks_uri: jwks_uri.into(),
                cache_duration: DEFAULT_CACHE_DURATION,
                cache: Arc::new(RwLock::new(None)),
            }
        }

        pub fn with_cache_duration(mut self, cache_duration: Duration) -> Self {
            self.cache_duration = cache_duration;
            self
        }

        /// Use a caller-supplied HTTP client (timeouts, proxies, TLS roots)
        pub fn with_http_client(mut self, http_client: Client) -> Self {
            self.http_client = http_client;
            self
        }

        /// Seed the cache, e.g. from a JWKS bundled with the deployment
        pub async fn preload(&self, jwk_set: &JwkSet) {
            let mut cache = self.cache.write().await;
            *cache = Some(CachedKeys {
                keys: parse_jwk_set(jwk_set),
                fetched_at: SystemTime::now(),
            });
        }

        async fn key_for(&self, kid: &str) -> Result<(DecodingKey, Algorithm)> {
            {
                let cache = self.cache.read().await;
                if let Some(cached) = cache.as_ref() {
                    let fresh = cached
                        .fetched_at
                        .elapsed()
                        .map(|age| age < self.cache_duration)
                        .unwrap_or(false);
                    if fresh {
                        return cached.keys.get(kid).cloned().ok_or_else(|| {
                            GateError::Signature(format!("No key found for kid: {}", kid))
                        });
                    }
                }
            }

            let keys = self.fetch().await?;
            let found = keys.get(kid).cloned();
            {
                let mut cache = self.cache.write().await;
                *cache = Some(CachedKeys {
                    keys,
                    fetched_at: SystemTime::now(),
                });
            }
            found.ok_or_else(|| GateError::Signature(format!("No key found for kid: {}", kid)))
        }

        async fn fetch(&self) -> Result<KeyMap> {
            tracing::debug!("Fetching JWKS from: {}", self.jwks_uri);

            let response = self
                .http_client
                .get(&self.jwks_uri)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|e| GateError::JwksFetch(format!("Failed to fetch JWKS: {}", e)))?;

            if !response.status().is_success() {
                return Err(GateError::JwksFetch(format!(
                    "JWKS fetch failed with status: {}",
                    response.status()
                )));
            }

            let jwk_set: JwkSet = response
                .json()
                .await
                .map_err(|e| GateError::JwksFetch(format!("Failed to parse JWKS: {}", e)))?;

            Ok(parse_jwk_set(&jwk_set))
        }
    }

    #[async_trait]
    impl SignatureVerifier for JwksVerifier {
        async fn verify(&self, token: &str) -> Result<()> {
            let header = decode_header(token)
                .map_err(|e| GateError::Signature(format!("Invalid token header: {}", e)))?;
            let kid = header
                .kid
                .ok_or_else(|| GateError::Signature("Token missing kid in header".to_string()))?;

            let (key, key_algorithm) = self.key_for(&kid).await?;
            if header.alg != key_algorithm {
                tracing::warn!(
                    "Token header algorithm ({:?}) doesn't match key algorithm ({:?}) for kid {}. Using key algorithm.",
                    header.alg,
                    key_algorithm,
                    kid
                );
            }
            verify_with_key(token, &key, key_algorithm)
        }
    }
}
