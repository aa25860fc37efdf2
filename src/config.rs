use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::extractor::ClaimTemplate;
use crate::telemetry::LogFormat;
use crate::template::Template;
use crate::trust_store::Issuer;
use crate::trust_store::PublicKey;
use crate::trust_store::TrustStore;

const DEFAULT_ADDRESS: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 443;

/// Configuration for the token validator
#[derive(Debug, Clone, Default)]
pub struct ValidatorConfig {
    /// Clock skew tolerated when checking `exp`, `nbf` and `iat` (default: none)
    pub(crate) leeway: Duration,
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tolerated clock skew
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }
}

/// Service configuration file
///
/// ```yaml
/// address: 0.0.0.0
/// port: 443
/// issuers:
///   - name: cluster-a
///     issuer: https://issuer-a.example
///     publicKey: keys/issuer-a.pem
///     template:
///       uid: "{{ .sub }}"
///       username: "{{ .username }}"
///       group: "{{ . }}"
///       groupsField: groups
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub leeway_seconds: u64,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub issuers: Vec<IssuerConfig>,
    /// Directory relative key paths are resolved against
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// One trusted issuer as written in the configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerConfig {
    pub name: String,
    pub issuer: String,
    /// Path to a PEM encoded public key
    pub public_key: PathBuf,
    #[serde(default)]
    pub audiences: Vec<String>,
    pub template: TemplateConfig,
}

/// Claim mapping templates as written in the configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    pub uid: String,
    pub username: String,
    pub group: String,
    pub groups_field: String,
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Config {
    /// Read the configuration file at `path`
    ///
    /// Relative key paths inside the file are resolved against the directory
    /// holding it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_yaml(&contents)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse a configuration document
    ///
    /// Relative key paths stay relative to the working directory.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load every issuer's key and compile its templates
    pub fn trust_store(&self) -> Result<TrustStore, ConfigError> {
        if self.issuers.is_empty() {
            return Err(ConfigError::NoIssuers);
        }

        let issuers = self
            .issuers
            .iter()
            .map(|issuer| issuer.build(self.base_dir.as_deref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TrustStore::new(issuers))
    }

    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig::new().with_leeway(Duration::from_secs(self.leeway_seconds))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl IssuerConfig {
    fn build(&self, base_dir: Option<&Path>) -> Result<Issuer, ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::EmptyIssuer(self.name.clone()));
        }

        let public_key = self.load_public_key(base_dir)?;
        let template = self.template.compile(&self.name)?;

        let issuer = Issuer::new(&self.name, &self.issuer, public_key, template);
        Ok(issuer.with_audiences(self.audiences.clone()))
    }

    fn load_public_key(&self, base_dir: Option<&Path>) -> Result<PublicKey, ConfigError> {
        let path = match base_dir {
            Some(dir) if self.public_key.is_relative() => dir.join(&self.public_key),
            _ => self.public_key.clone(),
        };

        let pem = std::fs::read(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        PublicKey::from_pem(&pem).map_err(|e| ConfigError::InvalidPublicKey {
            issuer: self.name.clone(),
            reason: format!("{}: {e}", path.display()),
        })
    }
}

impl TemplateConfig {
    /// Compile the templates of issuer `issuer`
    pub fn compile(&self, issuer: &str) -> Result<ClaimTemplate, ConfigError> {
        let parse = |template: &'static str, source: &str| {
            Template::parse(template, source).map_err(|source| ConfigError::TemplateParse {
                issuer: issuer.to_string(),
                template,
                source,
            })
        };

        Ok(ClaimTemplate::new(
            parse("uid", &self.uid)?,
            parse("username", &self.username)?,
            parse("group", &self.group)?,
            &self.groups_field,
        ))
    }
}
