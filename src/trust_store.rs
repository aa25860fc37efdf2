use std::collections::HashSet;
use std::fmt;

use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use tracing::warn;

use crate::extractor::ClaimTemplate;

const RSA_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];
const EC_ALGORITHMS: &[Algorithm] = &[Algorithm::ES256, Algorithm::ES384];
const ED_ALGORITHMS: &[Algorithm] = &[Algorithm::EdDSA];

/// Family of an issuer's verification key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
    Ec,
    Ed,
}

/// Public key of an issuer, together with the signing algorithms it may verify
#[derive(Clone)]
pub struct PublicKey {
    key: DecodingKey,
    family: KeyFamily,
}

impl PublicKey {
    /// Parse a PEM encoded public key, accepting RSA, EC and Ed25519 keys
    pub fn from_pem(pem: &[u8]) -> jsonwebtoken::errors::Result<Self> {
        Self::from_rsa_pem(pem)
            .or_else(|_| Self::from_ec_pem(pem))
            .or_else(|_| Self::from_ed_pem(pem))
    }

    pub fn from_rsa_pem(pem: &[u8]) -> jsonwebtoken::errors::Result<Self> {
        Ok(Self::new(DecodingKey::from_rsa_pem(pem)?, KeyFamily::Rsa))
    }

    pub fn from_ec_pem(pem: &[u8]) -> jsonwebtoken::errors::Result<Self> {
        Ok(Self::new(DecodingKey::from_ec_pem(pem)?, KeyFamily::Ec))
    }

    pub fn from_ed_pem(pem: &[u8]) -> jsonwebtoken::errors::Result<Self> {
        Ok(Self::new(DecodingKey::from_ed_pem(pem)?, KeyFamily::Ed))
    }

    /// Build an RSA key from its base64url encoded modulus and exponent
    pub fn from_rsa_components(n: &str, e: &str) -> jsonwebtoken::errors::Result<Self> {
        Ok(Self::new(DecodingKey::from_rsa_components(n, e)?, KeyFamily::Rsa))
    }

    fn new(key: DecodingKey, family: KeyFamily) -> Self {
        Self { key, family }
    }

    pub fn family(&self) -> KeyFamily {
        self.family
    }

    /// Signing algorithms a token may use to be verified by this key
    pub fn algorithms(&self) -> &'static [Algorithm] {
        match self.family {
            KeyFamily::Rsa => RSA_ALGORITHMS,
            KeyFamily::Ec => EC_ALGORITHMS,
            KeyFamily::Ed => ED_ALGORITHMS,
        }
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

/// A trusted token issuer
#[derive(Debug, Clone)]
pub struct Issuer {
    /// Informational name, used in logs
    pub name: String,
    /// Value the token's `iss` claim must equal
    pub issuer: String,
    pub public_key: PublicKey,
    pub template: ClaimTemplate,
    /// Expected audiences; when empty the `aud` claim is not checked
    pub audiences: Vec<String>,
}

impl Issuer {
    pub fn new(
        name: impl Into<String>,
        issuer: impl Into<String>,
        public_key: PublicKey,
        template: ClaimTemplate,
    ) -> Self {
        Self {
            name: name.into(),
            issuer: issuer.into(),
            public_key,
            template,
            audiences: Vec::new(),
        }
    }

    /// Require tokens from this issuer to carry at least one of `audiences`
    pub fn with_audiences(mut self, audiences: Vec<String>) -> Self {
        self.audiences = audiences;
        self
    }
}

/// Ordered, immutable set of trusted issuers
///
/// Several issuers may share an issuer identifier (for example while a
/// signing key is being replaced); the validator then tries their keys in
/// configuration order.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    issuers: Vec<Issuer>,
}

impl TrustStore {
    pub fn new(issuers: Vec<Issuer>) -> Self {
        let mut seen = HashSet::new();
        for issuer in &issuers {
            if !seen.insert(issuer.issuer.as_str()) {
                warn!(
                    name = %issuer.name,
                    issuer = %issuer.issuer,
                    "issuer identifier configured more than once, keys will be tried in order"
                );
            }
        }

        Self { issuers }
    }

    /// Every issuer whose identifier equals `issuer`, in configuration order
    pub fn find_candidates(&self, issuer: &str) -> Vec<&Issuer> {
        self.issuers.iter().filter(|i| i.issuer == issuer).collect()
    }

    pub fn len(&self) -> usize {
        self.issuers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issuers.is_empty()
    }
}
