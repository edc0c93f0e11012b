use std::sync::Arc;

use crate::config::AppConfig;
use crate::guests::repo::GuestStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<GuestStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = Arc::new(GuestStore::open(&config).await?);
        Ok(Self { store, config })
    }

    pub fn from_parts(store: Arc<GuestStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }
}
