//! Configuration loading for authgate
//!
//! Settings are read once from a TOML file and are immutable afterwards.
//!
//! # Example
//!
//! ```rust,ignore
//! use authgate::config::load_config;
//!
//! let config = load_config("authgate.toml")?;
//! let engine = authgate::AuthEngine::builder(config.auth).build()?;
//! ```
//!
//! ```toml
//! [auth]
//! scheme = "jwt"
//! issuer = "https://idp.example.com"
//! public_paths = ["/health", { regex = "^/docs(/.*)?$" }]
//! protected_paths = ["/api/"]
//!
//! [auth.roles]
//! "/api/admin" = ["admin"]
//! ```

use crate::auth::claims::ValidationOptions;
use crate::auth::credential::Scheme;
use crate::auth::decision::ErrorMessage;
use crate::auth::paths::{PathPattern, PathRules};
use crate::{GateError, Result};
use http::{HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub auth: AuthSettings,
}

impl GateConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_config(path)
    }
}

/// A configured path pattern: a literal prefix or `{ regex = "..." }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternConfig {
    Prefix(String),
    Regex { regex: String },
}

impl PatternConfig {
    fn compile(&self) -> Result<PathPattern> {
        match self {
            PatternConfig::Prefix(literal) => Ok(PathPattern::prefix(literal.clone())),
            PatternConfig::Regex { regex } => PathPattern::regex(regex)
                .map_err(|e| GateError::Config(format!("Invalid path regex {:?}: {}", regex, e))),
        }
    }
}

/// `[auth]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub scheme: Scheme,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub ignore_expiration: bool,
    pub check_not_before: bool,
    pub leeway_secs: u64,
    /// Refuse to build a JWT engine without a signature verifier
    pub require_signature: bool,
    pub public_paths: Vec<PatternConfig>,
    pub protected_paths: Vec<PatternConfig>,
    /// Exact path → roles, any one of which grants access
    pub roles: HashMap<String, Vec<String>>,
    pub unauthorized_status: u16,
    pub unauthorized_message: ErrorMessage,
    pub forbidden_status: u16,
    pub forbidden_message: ErrorMessage,
    /// Realm advertised in the Basic challenge
    pub realm: String,
    /// Session entry holding the identity
    pub session_key: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            scheme: Scheme::Jwt,
            issuer: None,
            audience: None,
            ignore_expiration: false,
            check_not_before: true,
            leeway_secs: 0,
            require_signature: false,
            public_paths: Vec::new(),
            protected_paths: Vec::new(),
            roles: HashMap::new(),
            unauthorized_status: 401,
            unauthorized_message: ErrorMessage::Text("Unauthorized".to_string()),
            forbidden_status: 403,
            forbidden_message: ErrorMessage::Text("Forbidden".to_string()),
            realm: "Restricted".to_string(),
            session_key: "user".to_string(),
        }
    }
}

impl AuthSettings {
    /// Compile the path lists and role map
    pub fn compile_rules(&self) -> Result<PathRules> {
        let public = self
            .public_paths
            .iter()
            .map(PatternConfig::compile)
            .collect::<Result<Vec<_>>>()?;
        let protected = self
            .protected_paths
            .iter()
            .map(PatternConfig::compile)
            .collect::<Result<Vec<_>>>()?;
        let roles = self
            .roles
            .iter()
            .map(|(path, roles)| {
                (
                    path.clone(),
                    roles.iter().cloned().collect::<BTreeSet<String>>(),
                )
            })
            .collect();
        Ok(PathRules::new(public, protected, roles))
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
            check_expiration: !self.ignore_expiration,
            check_not_before: self.check_not_before,
            leeway_secs: self.leeway_secs,
        }
    }

    pub fn unauthorized_status(&self) -> Result<StatusCode> {
        status(self.unauthorized_status, "unauthorized_status")
    }

    pub fn forbidden_status(&self) -> Result<StatusCode> {
        status(self.forbidden_status, "forbidden_status")
    }

    /// `Basic realm="<realm>"`, checked to be a valid header value
    pub fn basic_challenge(&self) -> Result<String> {
        let challenge = format!("Basic realm=\"{}\"", self.realm.replace('"', "\\\""));
        HeaderValue::from_str(&challenge)
            .map_err(|e| GateError::Config(format!("Invalid realm {:?}: {}", self.realm, e)))?;
        Ok(challenge)
    }
}

fn status(code: u16, field: &str) -> Result<StatusCode> {
    StatusCode::from_u16(code)
        .map_err(|e| GateError::Config(format!("Invalid {} {}: {}", field, code, e)))
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GateConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| GateError::Config(format!("Failed to read config file: {}", e)))?;

    toml::from_str(&content)
        .map_err(|e| GateError::Config(format!("Failed to parse TOML config: {}", e)))
}
