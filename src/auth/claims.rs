//! Decoded token claims and their time/issuer/audience checks
//!
//! Claims are untrusted until [`validate`] passes. Nothing downstream reads
//! them before that.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Claim map decoded from a compact token payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Subject: `sub`, falling back to `id`
    pub fn subject(&self) -> Option<&Value> {
        self.0
            .get("sub")
            .or_else(|| self.0.get("id"))
            .filter(|v| v.is_string() || v.is_number())
    }

    /// `exp` in epoch seconds; `Err` when present but not numeric
    pub fn exp(&self) -> Result<Option<i64>, ClaimsViolation> {
        self.date_claim("exp")
    }

    /// `nbf` in epoch seconds; `Err` when present but not numeric
    pub fn nbf(&self) -> Result<Option<i64>, ClaimsViolation> {
        self.date_claim("nbf")
    }

    fn date_claim(&self, name: &'static str) -> Result<Option<i64>, ClaimsViolation> {
        match self.0.get(name) {
            None => Ok(None),
            Some(value) => epoch_seconds(value)
                .map(Some)
                .ok_or(ClaimsViolation::MalformedDate(name)),
        }
    }

    pub fn iss(&self) -> Option<&str> {
        self.0.get("iss").and_then(Value::as_str)
    }

    /// True when `aud` equals `audience`, or is an array containing it
    pub fn has_audience(&self, audience: &str) -> bool {
        match self.0.get("aud") {
            Some(Value::String(aud)) => aud == audience,
            Some(Value::Array(auds)) => auds.iter().any(|a| a.as_str() == Some(audience)),
            _ => false,
        }
    }

    /// `roles` as strings (empty if absent or not an array)
    pub fn roles(&self) -> Vec<String> {
        self.string_array("roles")
    }

    /// `permissions` as strings (empty if absent or not an array)
    pub fn permissions(&self) -> Vec<String> {
        self.string_array("permissions")
    }

    fn string_array(&self, name: &str) -> Vec<String> {
        if let Some(Value::Array(items)) = self.0.get(name) {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        } else {
            Vec::new()
        }
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// Numeric dates may arrive as floats; fractional seconds are dropped.
fn epoch_seconds(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|secs| secs.floor() as i64))
}

/// Which claims check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClaimsViolation {
    #[error("token has expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("issuer mismatch")]
    IssuerMismatch,

    #[error("audience mismatch")]
    AudienceMismatch,

    #[error("claim `{0}` is not a numeric date")]
    MalformedDate(&'static str),
}

/// Expectations the claims are checked against
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub check_expiration: bool,
    pub check_not_before: bool,
    /// Clock skew tolerance applied to `exp` and `nbf`
    pub leeway_secs: u64,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            issuer: None,
            audience: None,
            check_expiration: true,
            check_not_before: true,
            leeway_secs: 0,
        }
    }
}

/// Current Unix time in seconds
pub fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Check expiry, not-before, issuer and audience, stopping at the first failure
///
/// A token without `exp` never expires; one whose `exp` is not a number fails.
pub fn validate(
    claims: &Claims,
    options: &ValidationOptions,
    now: i64,
) -> Result<(), ClaimsViolation> {
    let leeway = i64::try_from(options.leeway_secs).unwrap_or(i64::MAX);

    if options.check_expiration {
        if let Some(exp) = claims.exp()? {
            if now > exp.saturating_add(leeway) {
                return Err(ClaimsViolation::Expired);
            }
        }
    }

    if options.check_not_before {
        if let Some(nbf) = claims.nbf()? {
            if now < nbf.saturating_sub(leeway) {
                return Err(ClaimsViolation::NotYetValid);
            }
        }
    }

    if let Some(issuer) = &options.issuer {
        if claims.iss() != Some(issuer.as_str()) {
            return Err(ClaimsViolation::IssuerMismatch);
        }
    }

    if let Some(audience) = &options.audience {
        if !claims.has_audience(audience) {
            return Err(ClaimsViolation::AudienceMismatch);
        }
    }

    Ok(())
}
