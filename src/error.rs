use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a token is rejected
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to parse JWT: {0}")]
    MalformedToken(#[source] jsonwebtoken::errors::Error),
    #[error("No configured issuer matches the token issuer {0:?}")]
    UnknownIssuer(String),
    #[error("Failed to find an issuer with a matching public key for {0:?}")]
    NoMatchingKey(String),
    #[error(transparent)]
    ExpiredOrNotYetValid(#[from] TemporalError),
    #[error("The provided JWT is not intended for any of the expected audiences")]
    InvalidAudience,
    #[error(transparent)]
    ClaimRender(#[from] RenderError),
}

/// Violations of the `exp`, `nbf` and `iat` claims
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemporalError {
    #[error("The provided JWT has no expiration claim")]
    MissingExpiry,
    #[error("The provided JWT has expired. Expiration timestamp: {exp}")]
    Expired { exp: i64, now: i64 },
    #[error("The provided JWT is not valid yet. Not-before timestamp: {nbf}")]
    NotYetValid { nbf: i64, now: i64 },
    #[error("The provided JWT was issued in the future. Issued-at timestamp: {iat}")]
    IssuedInFuture { iat: i64, now: i64 },
}

/// Failures while mapping verified claims onto an identity
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Claim {0:?} is not present in the token")]
    MissingField(String),
    #[error("Failed to execute the {template} template: {source}")]
    TemplateExecution {
        template: &'static str,
        #[source]
        source: TemplateError,
    },
    #[error("Failed to cast {field:?} claim to array, got {found}")]
    GroupsFieldType { field: String, found: &'static str },
}

/// Errors raised by claim templates, both at compile and at execution time
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("{0}")]
    Syntax(String),
    #[error("map has no entry for key {0:?}")]
    MissingKey(String),
    #[error("can't evaluate field {field} in type {found}")]
    NotAnObject { field: String, found: &'static str },
    #[error("can't index item of type {found} with {key}")]
    BadIndex { key: String, found: &'static str },
    #[error("index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("refusing to render {0} value")]
    Unprintable(&'static str),
}

/// Startup errors raised while loading the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid public key for issuer {issuer:?}: {reason}")]
    InvalidPublicKey { issuer: String, reason: String },
    #[error("Failed to parse {template} template for issuer {issuer:?}: {source}")]
    TemplateParse {
        issuer: String,
        template: &'static str,
        #[source]
        source: TemplateError,
    },
    #[error("Issuer {0:?} has an empty issuer identifier")]
    EmptyIssuer(String),
    #[error("No issuers configured - at least one trusted issuer is required")]
    NoIssuers,
}

pub(crate) fn template_error(template: &'static str) -> impl FnOnce(TemplateError) -> RenderError {
    move |source| RenderError::TemplateExecution { template, source }
}
