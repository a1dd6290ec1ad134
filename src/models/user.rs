//! Admin account model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Administrator account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub last_login_ip: Option<String>,
    pub last_login_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: 0,
            username: username.into(),
            password_hash: password_hash.into(),
            last_login_ip: None,
            last_login_time: None,
            created_at: Utc::now(),
        }
    }
}

/// Input for creating an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountInput {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_is_not_serialized() {
        let account = Account::new("admin", "$argon2id$secret");
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("secret"));
        assert!(json.contains("\"username\":\"admin\""));
    }
}
