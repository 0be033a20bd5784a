use serde::{Deserialize, Serialize};

/// User record as returned by the user-management service.
///
/// Unknown fields (collection metadata, verification flags, anything the
/// service adds later) are dropped during deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>, // file name, "" when unset
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default)]
    pub remember_token: Option<String>,
    pub created: String,
    pub updated: String,
}

/// Body sent to the service to create a user record.
#[derive(Debug, Clone, Serialize)]
pub struct CreateUserPayload {
    pub username: String,
    pub email: String,
    #[serde(rename = "emailVisibility")]
    pub email_visibility: bool,
    pub password: String,
    #[serde(rename = "passwordConfirm")]
    pub password_confirm: String,
    pub name: String,
    pub is_banned: bool,
    pub remember_token: Option<String>,
}
