//! The authenticated principal attached to a request

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

use super::claims::Claims;

/// Identifier of a principal, textual or numeric
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdentityId {
    Text(String),
    Number(i64),
}

impl IdentityId {
    fn from_claim(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(IdentityId::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(IdentityId::Number),
            _ => None,
        }
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityId::Text(s) => f.write_str(s),
            IdentityId::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for IdentityId {
    fn from(value: &str) -> Self {
        IdentityId::Text(value.to_string())
    }
}

impl From<String> for IdentityId {
    fn from(value: String) -> Self {
        IdentityId::Text(value)
    }
}

impl From<i64> for IdentityId {
    fn from(value: i64) -> Self {
        IdentityId::Number(value)
    }
}

/// A resolved principal, built fresh for every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    /// Scheme-specific attributes carried through uninterpreted
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Identity {
    pub fn new(id: impl Into<IdentityId>) -> Self {
        Self {
            id: id.into(),
            username: None,
            email: None,
            roles: BTreeSet::new(),
            permissions: BTreeSet::new(),
            extra: Map::new(),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Build an identity from validated claims
    ///
    /// `id` comes from `sub` (or `id`); `roles` and `permissions` are copied
    /// when they are string arrays; every other claim lands in `extra`.
    /// Returns `None` when the claims carry no usable subject.
    pub fn from_claims(claims: Claims) -> Option<Self> {
        let id = claims.subject().and_then(IdentityId::from_claim)?;
        let id_key = if claims.get("sub").is_some() { "sub" } else { "id" };
        let roles = claims.roles();
        let permissions = claims.permissions();

        let mut extra = claims.into_map();
        extra.remove(id_key);
        for key in ["roles", "permissions"] {
            if matches!(extra.get(key), Some(Value::Array(_))) {
                extra.remove(key);
            }
        }

        Some(Self {
            id,
            username: None,
            email: None,
            roles: roles.into_iter().collect(),
            permissions: permissions.into_iter().collect(),
            extra,
        })
    }

    /// Interpret a stored session value as an identity, if it has that shape
    ///
    /// Only JSON objects qualify; serde would otherwise fill the struct from
    /// an array by position.
    pub fn from_session_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|role| self.has_role(role.as_ref()))
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub fn has_any_permission<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        permissions
            .iter()
            .any(|permission| self.has_permission(permission.as_ref()))
    }
}
