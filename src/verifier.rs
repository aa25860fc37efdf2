use std::collections::HashSet;

use chrono::Utc;
use jsonwebtoken::dangerous;
use jsonwebtoken::decode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::TokenData;
use jsonwebtoken::Validation;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::claims::Claims;
use crate::claims::Identity;
use crate::claims::RegisteredClaims;
use crate::config::ValidatorConfig;
use crate::error::Error;
use crate::error::Result;
use crate::error::TemporalError;
use crate::trust_store::Issuer;
use crate::trust_store::TrustStore;

/// Trait for token verification
pub trait VerifyToken: Send + Sync {
    /// Verify a token and derive the identity it asserts
    fn verify(&self, token: &str) -> Result<Identity>;
}

/// Validates tokens against a fixed set of trusted issuers
///
/// The trust store is immutable once the validator is built, so a single
/// validator can serve any number of concurrent requests.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    trust_store: TrustStore,
    leeway: i64,
}

/// Claims of a token whose signature has been checked against `issuer`'s key
struct VerifiedToken<'a> {
    issuer: &'a Issuer,
    registered: RegisteredClaims,
    claims: Claims,
}

impl TokenValidator {
    pub fn new(trust_store: TrustStore, config: ValidatorConfig) -> Self {
        Self {
            trust_store,
            leeway: i64::try_from(config.leeway.as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// Validate `token` against the current time
    pub fn validate(&self, token: &str) -> Result<Identity> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Validate `token` as if the current time were `now` (Unix seconds)
    pub fn validate_at(&self, token: &str, now: i64) -> Result<Identity> {
        let unverified = parse_unverified(token)?;
        let issuer = unverified.iss.unwrap_or_default();

        let candidates = self.trust_store.find_candidates(&issuer);
        if candidates.is_empty() {
            return Err(Error::UnknownIssuer(issuer));
        }

        let verified = verify_signature(token, &issuer, &candidates)?;

        // Everything below reads the verified payload only
        validate_temporal(&verified.registered, now, self.leeway)?;
        validate_audience(verified.issuer, &verified.registered)?;

        let identity = verified.issuer.template.render(&verified.claims)?;
        debug!(issuer = %verified.issuer.name, uid = %identity.uid, "token validated");

        Ok(identity)
    }
}

impl VerifyToken for TokenValidator {
    fn verify(&self, token: &str) -> Result<Identity> {
        self.validate(token)
    }
}

/// Parse token data without signature validation to read the issuer
fn parse_unverified(token: &str) -> Result<RegisteredClaims> {
    // Only used to pick candidate issuers; nothing read here is trusted
    let token_data =
        dangerous::insecure_decode::<RegisteredClaims>(token).map_err(Error::MalformedToken)?;
    Ok(token_data.claims)
}

/// Try each candidate's key in order; the first one that verifies wins
fn verify_signature<'a>(
    token: &str,
    issuer: &str,
    candidates: &[&'a Issuer],
) -> Result<VerifiedToken<'a>> {
    for &candidate in candidates {
        let key = candidate.public_key.decoding_key();

        match decode::<Value>(token, key, &signature_validation(candidate)) {
            Ok(token_data) => return verified_claims(candidate, token_data),
            Err(e) => {
                debug!(issuer = %candidate.name, error = %e, "signature not verified by issuer key")
            }
        }
    }

    Err(Error::NoMatchingKey(issuer.to_string()))
}

/// Validation settings that only check the signature
///
/// Temporal and audience checks are done by the validator itself so that
/// their boundaries do not depend on library defaults.
fn signature_validation(issuer: &Issuer) -> Validation {
    let algorithms = issuer.public_key.algorithms();

    let mut validation = Validation::new(algorithms[0]);
    validation.algorithms = algorithms.to_vec();
    validation.required_spec_claims = HashSet::new();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.leeway = 0;

    validation
}

fn verified_claims<'a>(
    issuer: &'a Issuer,
    token_data: TokenData<Value>,
) -> Result<VerifiedToken<'a>> {
    let registered = RegisteredClaims::deserialize(&token_data.claims)
        .map_err(|e| Error::MalformedToken(e.into()))?;

    // Bind the issuer match to the verified payload as well
    if registered.iss.as_deref() != Some(issuer.issuer.as_str()) {
        return Err(Error::NoMatchingKey(registered.iss.unwrap_or_default()));
    }

    let Value::Object(claims) = token_data.claims else {
        return Err(Error::MalformedToken(ErrorKind::InvalidToken.into()));
    };

    Ok(VerifiedToken {
        issuer,
        registered,
        claims,
    })
}

fn validate_temporal(
    claims: &RegisteredClaims,
    now: i64,
    leeway: i64,
) -> std::result::Result<(), TemporalError> {
    let exp = claims.exp.ok_or(TemporalError::MissingExpiry)?;
    if now.saturating_sub(leeway) >= exp {
        return Err(TemporalError::Expired { exp, now });
    }

    if let Some(nbf) = claims.nbf {
        if now.saturating_add(leeway) < nbf {
            return Err(TemporalError::NotYetValid { nbf, now });
        }
    }

    if let Some(iat) = claims.iat {
        if now.saturating_add(leeway) < iat {
            return Err(TemporalError::IssuedInFuture { iat, now });
        }
    }

    Ok(())
}

fn validate_audience(issuer: &Issuer, claims: &RegisteredClaims) -> Result<()> {
    if issuer.audiences.is_empty() {
        return Ok(());
    }

    match &claims.aud {
        Some(aud) if aud.contains_any(&issuer.audiences) => Ok(()),
        _ => Err(Error::InvalidAudience),
    }
}
