use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::claims::ClaimsViolation;

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_EMAIL: &str = "EMAIL";
pub const ROLE_MUTATE: &str = "MUTATE";
pub const ROLE_QUERY: &str = "QUERY";

/// Authorization roles of the travel service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Email,
    Mutate,
    Query,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Email, Role::Mutate, Role::Query];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Email => ROLE_EMAIL,
            Role::Mutate => ROLE_MUTATE,
            Role::Query => ROLE_QUERY,
        }
    }

    /// The role catalog handed to authenticators for this service.
    pub fn catalog() -> RoleSet {
        Role::ALL.into_iter().collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for Role {
    type Err = ClaimsViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ClaimsViolation::UnknownRole(s.to_string()))
    }
}

/// Closed set of role names an authenticator will sign or accept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            roles
                .into_iter()
                .map(Into::into)
                .filter(|role: &String| !role.trim().is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        RoleSet::new(iter.into_iter().map(|role| role.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_sensitive() {
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("QUERY".parse::<Role>(), Ok(Role::Query));
        assert_eq!(
            "admin".parse::<Role>(),
            Err(ClaimsViolation::UnknownRole("admin".into()))
        );
    }

    #[test]
    fn catalog_contains_every_role() {
        let catalog = Role::catalog();
        assert_eq!(catalog.len(), Role::ALL.len());
        for role in Role::ALL {
            assert!(catalog.contains(role.as_str()));
        }
        assert!(!catalog.contains("SUPERUSER"));
    }

    #[test]
    fn serde_uses_uppercase_names() {
        let value = serde_json::to_value(Role::Mutate).expect("serialize");
        assert_eq!(value, serde_json::json!("MUTATE"));
        let role: Role = serde_json::from_value(serde_json::json!("EMAIL")).expect("deserialize");
        assert_eq!(role, Role::Email);
    }

    #[test]
    fn role_set_drops_blank_entries() {
        let set = RoleSet::new(["ADMIN", " ", ""]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["ADMIN"]);
    }
}
