use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::auth::repo_types::{CreateUserPayload, UserRecord};
use crate::config::PocketBaseConfig;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("user service responded {status}: {message}")]
    Rejected {
        status: u16,
        message: String,
        data: Value,
    },
    #[error("user service request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Credentials obtained from a password authentication.
///
/// One store lives for the duration of a single request and is passed to the
/// service explicitly; nothing is shared between requests.
#[derive(Debug, Default)]
pub struct AuthStore {
    token: Option<String>,
    record_id: Option<String>,
}

impl AuthStore {
    pub fn save(&mut self, token: String, record_id: String) {
        self.token = Some(token);
        self.record_id = Some(record_id);
    }

    pub fn clear(&mut self) {
        self.token = None;
        self.record_id = None;
    }

    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    pub fn is_valid(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[async_trait]
pub trait UserService: Send + Sync {
    async fn create_user(&self, payload: &CreateUserPayload) -> Result<UserRecord, UpstreamError>;

    /// Authenticates and records the issued token in `store`.
    async fn auth_with_password(
        &self,
        store: &mut AuthStore,
        identity: &str,
        password: &str,
    ) -> Result<UserRecord, UpstreamError>;

    async fn request_verification(&self, email: &str) -> Result<(), UpstreamError>;
}

#[derive(Clone)]
pub struct PocketBase {
    client: Client,
    base_url: Url,
    collection: String,
}

#[derive(Debug, Serialize)]
struct PasswordAuthBody<'a> {
    identity: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct PasswordAuthResponse {
    token: String,
    record: UserRecord,
}

#[derive(Debug, Serialize)]
struct VerificationBody<'a> {
    email: &'a str,
}

impl PocketBase {
    pub fn new(config: &PocketBaseConfig) -> Self {
        Self::with_client(Client::new(), config.url.clone(), &config.users_collection)
    }

    pub fn with_client(client: Client, base_url: Url, collection: &str) -> Self {
        Self {
            client,
            base_url,
            collection: collection.to_string(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/api/collections/{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.collection,
            action
        )
    }
}

/// Turns a non-success response into `UpstreamError::Rejected`, keeping the
/// service's own message and field data when the body is JSON.
async fn check_status(response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "user service error".into());
    let data = body.get("data").cloned().unwrap_or(Value::Null);

    error!(status = status.as_u16(), %message, "user service rejected request");
    Err(UpstreamError::Rejected {
        status: status.as_u16(),
        message,
        data,
    })
}

#[async_trait]
impl UserService for PocketBase {
    async fn create_user(&self, payload: &CreateUserPayload) -> Result<UserRecord, UpstreamError> {
        let response = self
            .client
            .post(self.endpoint("records"))
            .json(payload)
            .send()
            .await?;
        let record: UserRecord = check_status(response).await?.json().await?;
        debug!(record_id = %record.id, "user record created");
        Ok(record)
    }

    async fn auth_with_password(
        &self,
        store: &mut AuthStore,
        identity: &str,
        password: &str,
    ) -> Result<UserRecord, UpstreamError> {
        let response = self
            .client
            .post(self.endpoint("auth-with-password"))
            .json(&PasswordAuthBody { identity, password })
            .send()
            .await?;
        let auth: PasswordAuthResponse = check_status(response).await?.json().await?;
        store.save(auth.token, auth.record.id.clone());
        debug!(record_id = %auth.record.id, "password auth succeeded");
        Ok(auth.record)
    }

    async fn request_verification(&self, email: &str) -> Result<(), UpstreamError> {
        let response = self
            .client
            .post(self.endpoint("request-verification"))
            .json(&VerificationBody { email })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}
