use std::collections::BTreeSet;

use super::identity::Identity;

/// At-least-one-of role check
///
/// An empty requirement always passes. An anonymous caller holds no roles.
pub fn authorize(identity: Option<&Identity>, required_roles: &BTreeSet<String>) -> bool {
    if required_roles.is_empty() {
        return true;
    }
    identity.is_some_and(|identity| {
        required_roles
            .iter()
            .any(|role| identity.roles.contains(role))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(roles: &[&str]) -> BTreeSet<String> {
        roles.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_empty_requirement_passes() {
        assert!(authorize(None, &required(&[])));
        assert!(authorize(Some(&Identity::new("u1")), &required(&[])));
    }

    #[test]
    fn test_any_of_semantics() {
        let identity = Identity::new("u1").with_roles(["editor"]);
        assert!(authorize(Some(&identity), &required(&["admin", "editor"])));
        assert!(!authorize(Some(&identity), &required(&["admin"])));
    }

    #[test]
    fn test_anonymous_fails_non_empty_requirement() {
        assert!(!authorize(None, &required(&["user"])));
    }

    #[test]
    fn test_identity_without_roles() {
        assert!(!authorize(Some(&Identity::new("u1")), &required(&["user"])));
    }
}
