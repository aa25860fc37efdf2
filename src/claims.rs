use serde::de::Error as _;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Number;
use serde_json::Map;
use serde_json::Value;

use crate::error::RenderError;

/// The decoded payload of a token: claim names mapped to arbitrary JSON values
pub type Claims = Map<String, Value>;

/// The registered JWT claims the validator reads for issuer selection and
/// temporal validation
///
/// All fields are optional at the parsing stage; the validator decides which
/// ones are mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegisteredClaims {
    /// Issuer (iss)
    pub iss: Option<String>,
    /// Subject (sub)
    pub sub: Option<String>,
    /// Audience (aud), either a single string or an array of strings
    pub aud: Option<Audience>,
    /// Expiration time as Unix timestamp (exp)
    #[serde(default, deserialize_with = "numeric_date")]
    pub exp: Option<i64>,
    /// Not-before time as Unix timestamp (nbf)
    #[serde(default, deserialize_with = "numeric_date")]
    pub nbf: Option<i64>,
    /// Issued-at time as Unix timestamp (iat)
    #[serde(default, deserialize_with = "numeric_date")]
    pub iat: Option<i64>,
}

/// RFC 7519 NumericDate: seconds since the epoch, possibly with a fraction
///
/// Fractions are truncated to whole seconds.
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if let Some(seconds) = number.as_i64() {
        return Ok(Some(seconds));
    }

    match number.as_f64() {
        Some(seconds) if seconds.is_finite() => Ok(Some(seconds.trunc() as i64)),
        _ => Err(D::Error::custom(format!("invalid NumericDate {number}"))),
    }
}

/// The `aud` claim, which RFC 7519 allows to be a string or an array
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    /// True if any of the token's audiences is one of `expected`
    pub fn contains_any(&self, expected: &[String]) -> bool {
        match self {
            Audience::Single(aud) => expected.contains(aud),
            Audience::Many(auds) => auds.iter().any(|aud| expected.contains(aud)),
        }
    }
}

/// Identity derived from a successfully validated token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub username: String,
    pub groups: Vec<String>,
}

/// Name of a JSON value's type, for error messages
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Look up `field` in `claims` and require it to hold an array
pub(crate) fn sequence<'a>(claims: &'a Claims, field: &str) -> Result<&'a [Value], RenderError> {
    match claims.get(field) {
        None => Err(RenderError::MissingField(field.to_string())),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(RenderError::GroupsFieldType {
            field: field.to_string(),
            found: kind_of(other),
        }),
    }
}
