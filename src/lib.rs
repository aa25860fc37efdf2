//! # tokenreview-hub
//!
//! A Kubernetes webhook token authenticator that accepts JWTs from several
//! trusted issuers and maps their claims onto cluster identities.
//!
//! ## Features
//!
//! - Issuer selection by the token's `iss` claim, with several keys allowed per
//!   issuer identifier (tried in configuration order, first match wins)
//! - Signature verification with RSA, EC and Ed25519 public keys
//! - Expiration, not-before and issued-at validation on the verified claims
//! - Per-issuer claim templates deriving uid, username and groups, failing on
//!   any missing claim instead of producing empty values
//! - A `TokenReview` webhook adapter and HTTP server
//!
//! ## Example
//!
//! ```rust,no_run
//! use tokenreview_hub::{
//!     ClaimTemplate, Issuer, PublicKey, Template, TokenValidator, TrustStore, ValidatorConfig,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let template = ClaimTemplate::new(
//!         Template::parse("uid", "{{ .sub }}")?,
//!         Template::parse("username", "{{ .username }}")?,
//!         Template::parse("group", "{{ . }}")?,
//!         "groups",
//!     );
//!     let key = PublicKey::from_pem(&std::fs::read("issuer-a.pem")?)?;
//!     let store = TrustStore::new(vec![Issuer::new("cluster-a", "issuer-a", key, template)]);
//!
//!     let validator = TokenValidator::new(store, ValidatorConfig::new());
//!
//!     let identity = validator.validate("eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9...")?;
//!     println!("{} ({}) in {:?}", identity.username, identity.uid, identity.groups);
//!
//!     Ok(())
//! }
//! ```

mod claims;
mod config;
mod error;
mod extractor;
pub mod server;
pub mod telemetry;
mod template;
mod trust_store;
mod verifier;
pub mod webhook;

// Re-exports for public API
pub use claims::Audience;
pub use claims::Claims;
pub use claims::Identity;
pub use claims::RegisteredClaims;
pub use config::Config;
pub use config::IssuerConfig;
pub use config::TemplateConfig;
pub use config::ValidatorConfig;
pub use error::ConfigError;
pub use error::Error;
pub use error::RenderError;
pub use error::Result;
pub use error::TemplateError;
pub use error::TemporalError;
pub use extractor::ClaimTemplate;
pub use template::Template;
pub use trust_store::Issuer;
pub use trust_store::KeyFamily;
pub use trust_store::PublicKey;
pub use trust_store::TrustStore;
pub use verifier::TokenValidator;
pub use verifier::VerifyToken;
