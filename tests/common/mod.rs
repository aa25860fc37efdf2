#![allow(dead_code)]

use std::path::PathBuf;

use jsonwebtoken::Algorithm;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use serde::Serialize;
use serde_json::json;
use serde_json::Value;
use tokenreview_hub::ClaimTemplate;
use tokenreview_hub::Issuer;
use tokenreview_hub::PublicKey;
use tokenreview_hub::Template;
use tokenreview_hub::TokenValidator;
use tokenreview_hub::TrustStore;
use tokenreview_hub::ValidatorConfig;

/// Fixed validation time used by tests that call `validate_at`
pub const NOW: i64 = 1_700_000_000;

pub const ISSUER: &str = "issuer-a";

/// Modulus and exponent of `rsa-primary.key`, base64url encoded
pub const PRIMARY_RSA_N: &str = "ALsQRtR6U2Rzjz2nsUAdntmN4nvzDwJpf2DX63LQk65cFi3HX1wSGL9VpGXbgzYYcB2WVYvLTfuozN-HwzMKNn3aXMlGpcz9K26Gv6I6sLfXh617zNafnowLWNU-aMxyHTODlnoiFbtTH5ZlPzC7l6HIWSCdx1RlgPmXnNwORIhhRET3nkgeiDfl5AlY-vWRyLbOIQTihiydiiqqE8kO8SVJ1QmkEYE7o62SmKfwH2V9Z7sJLPskdByMT2k2vDDDJzEHiQClQTBvghhTTo_jLurBrysD_jiWDvatlFiA0tyD1BeG_2p5YpqL3trok05P00Qpv7UMPK7uTkP0RJErMr0";
pub const PRIMARY_RSA_E: &str = "AQAB";

/// Test key pairs under `tests/fixtures` (fresh test keys, DO NOT use in production)
#[derive(Debug, Clone, Copy)]
pub enum TestKey {
    RsaPrimary,
    RsaSecondary,
    EcP256,
    Ed25519,
}

impl TestKey {
    fn stem(self) -> &'static str {
        match self {
            TestKey::RsaPrimary => "rsa-primary",
            TestKey::RsaSecondary => "rsa-secondary",
            TestKey::EcP256 => "ec-p256",
            TestKey::Ed25519 => "ed25519",
        }
    }

    pub fn algorithm(self) -> Algorithm {
        match self {
            TestKey::RsaPrimary | TestKey::RsaSecondary => Algorithm::RS256,
            TestKey::EcP256 => Algorithm::ES256,
            TestKey::Ed25519 => Algorithm::EdDSA,
        }
    }

    pub fn public_pem_path(self) -> PathBuf {
        fixture(&format!("{}.pub.pem", self.stem()))
    }

    pub fn public_key(self) -> PublicKey {
        let pem = std::fs::read(self.public_pem_path()).expect("Failed to read public key");
        PublicKey::from_pem(&pem).expect("Failed to parse public key")
    }

    pub fn encoding_key(self) -> EncodingKey {
        let path = fixture(&format!("{}.key", self.stem()));
        let pem = std::fs::read(path).expect("Failed to read private key");
        match self {
            TestKey::RsaPrimary | TestKey::RsaSecondary => EncodingKey::from_rsa_pem(&pem),
            TestKey::EcP256 => EncodingKey::from_ec_pem(&pem),
            TestKey::Ed25519 => EncodingKey::from_ed_pem(&pem),
        }
        .expect("Failed to create encoding key")
    }
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

/// Sign `claims` with `key` using the key's default algorithm
pub fn create_test_jwt<T: Serialize>(claims: &T, key: TestKey) -> String {
    let header = Header::new(key.algorithm());

    jsonwebtoken::encode(&header, claims, &key.encoding_key()).expect("Failed to encode JWT")
}

/// Claims accepted at `NOW` by an issuer using `default_template`
pub fn valid_claims(issuer: &str) -> Value {
    json!({
        "iss": issuer,
        "sub": "u1",
        "aud": ["kubernetes"],
        "username": "alice",
        "groups": ["eng", "sre"],
        "iat": NOW - 60,
        "exp": NOW + 300,
    })
}

pub fn with_claim(mut claims: Value, name: &str, value: Value) -> Value {
    claims[name] = value;
    claims
}

pub fn without_claim(mut claims: Value, name: &str) -> Value {
    claims.as_object_mut().expect("claims are an object").remove(name);
    claims
}

pub fn template(uid: &str, username: &str, group: &str, groups_field: &str) -> ClaimTemplate {
    ClaimTemplate::new(
        Template::parse("uid", uid).unwrap(),
        Template::parse("username", username).unwrap(),
        Template::parse("group", group).unwrap(),
        groups_field,
    )
}

pub fn default_template() -> ClaimTemplate {
    template("{{ .sub }}", "{{ .username }}", "{{ . }}", "groups")
}

pub fn issuer(name: &str, iss: &str, key: TestKey) -> Issuer {
    Issuer::new(name, iss, key.public_key(), default_template())
}

pub fn validator(issuers: Vec<Issuer>) -> TokenValidator {
    TokenValidator::new(TrustStore::new(issuers), ValidatorConfig::new())
}

/// Validator trusting `ISSUER` with the primary RSA key
pub fn default_validator() -> TokenValidator {
    validator(vec![issuer("cluster-a", ISSUER, TestKey::RsaPrimary)])
}
