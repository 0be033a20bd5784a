use crate::config::AppConfig;
use crate::pocketbase::{PocketBase, UserService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserService>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let users = Arc::new(PocketBase::new(&config.pocketbase)) as Arc<dyn UserService>;
        Ok(Self { config, users })
    }

    pub fn from_parts(config: Arc<AppConfig>, users: Arc<dyn UserService>) -> Self {
        Self { config, users }
    }

    #[cfg(test)]
    pub(crate) fn fake(users: Arc<dyn UserService>) -> Self {
        use crate::config::PocketBaseConfig;

        let config = Arc::new(AppConfig {
            pocketbase: PocketBaseConfig {
                url: reqwest::Url::parse("http://127.0.0.1:8090").expect("static url"),
                users_collection: "users".into(),
                request_verification: false,
            },
        });
        Self::from_parts(config, users)
    }
}
