use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_USERS_FILE: &str = "users.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: String,
}

/// Users that tokens can be minted for, loaded from a JSON array.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<User>,
}

impl UserDirectory {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read user directory {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Failed to parse user directory {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let users: Vec<User> = serde_json::from_str(raw)?;
        if let Some(user) = users.iter().find(|user| user.id.trim().is_empty()) {
            return Err(anyhow!("user {} has an empty id", user.email));
        }
        Ok(Self { users })
    }

    /// Emails are compared case-insensitively.
    pub fn find_by_email(&self, email: &str) -> Result<&User> {
        let email = email.trim();
        self.users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .ok_or_else(|| anyhow!("no user found with email {email}"))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
