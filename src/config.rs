use anyhow::Context;
use reqwest::Url;

#[derive(Debug, Clone)]
pub struct PocketBaseConfig {
    pub url: Url,
    pub users_collection: String,
    pub request_verification: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pocketbase: PocketBaseConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let raw_url = std::env::var("POCKETBASE_URL").context("missing POCKETBASE_URL env variable")?;
        let pocketbase = PocketBaseConfig {
            url: parse_base_url(&raw_url)?,
            users_collection: std::env::var("POCKETBASE_USERS_COLLECTION")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "users".into()),
            request_verification: std::env::var("POCKETBASE_REQUEST_VERIFICATION")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        };
        Ok(Self { pocketbase })
    }
}

/// Parses the service base URL. Empty or relative values are fatal.
pub fn parse_base_url(raw: &str) -> anyhow::Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        anyhow::bail!("missing POCKETBASE_URL env variable");
    }
    Url::parse(trimmed).with_context(|| format!("invalid POCKETBASE_URL: {trimmed}"))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
