//! Typed HTTP client for the storefront API, as used by the UI.

pub mod error_message;

use reqwest::{header, Client, Response, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::dto::UserData;
use error_message::{handle_http_error, HttpFailure};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8787";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("storefront API responded {status}")]
    Http { status: u16, body: Option<Value> },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid base url: {0}")]
    BaseUrl(String),
}

impl ClientError {
    pub fn to_failure(&self) -> HttpFailure {
        match self {
            ClientError::Http { status, body } => HttpFailure::Transport {
                status: Some(*status),
                body: body.clone(),
            },
            other => HttpFailure::from_error(other),
        }
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        handle_http_error(&self.to_failure())
    }
}

/// Registration form as submitted by the UI.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterForm {
    pub email: String,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub password: String,
}

#[derive(Clone)]
pub struct StorefrontClient {
    http: Client,
    base_url: Url,
}

impl StorefrontClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::BaseUrl(e.to_string()))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        headers.insert(
            "ngrok-skip-browser-warning",
            header::HeaderValue::from_static("true"),
        );
        let http = Client::builder().default_headers(headers).build()?;

        Ok(Self { http, base_url })
    }

    fn auth_url(&self) -> String {
        format!("{}/auth", self.base_url.as_str().trim_end_matches('/'))
    }

    pub async fn register(&self, form: &RegisterForm) -> Result<UserData, ClientError> {
        debug!(email = %form.email, "register");
        let response = self.http.post(self.auth_url()).json(form).send().await?;
        read_user(response).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserData, ClientError> {
        debug!(%email, "login");
        let response = self
            .http
            .get(self.auth_url())
            .query(&[("email", email), ("password", password)])
            .send()
            .await?;
        read_user(response).await
    }
}

async fn read_user(response: Response) -> Result<UserData, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<Value>(&text).ok();
    warn!(status = status.as_u16(), "storefront API call failed");
    Err(ClientError::Http {
        status: status.as_u16(),
        body,
    })
}
