use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::repo_types::UserRecord;

/// Request body for `POST /auth`.
///
/// Fields are kept as raw JSON so that a missing field and a field of the
/// wrong type both surface as the same validation error.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub first_name: Option<Value>,
    #[serde(default)]
    pub last_name: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
}

/// Query string for `GET /auth`.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Public view of a user returned by both auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub is_banned: bool,
    pub remember_token: Option<String>,
    pub created: String,
    pub updated: String,
}

impl From<UserRecord> for UserData {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            name: record.name,
            email: record.email,
            avatar: record.avatar.filter(|a| !a.is_empty()),
            is_banned: record.is_banned,
            remember_token: record.remember_token.filter(|t| !t.is_empty()),
            created: record.created,
            updated: record.updated,
        }
    }
}
