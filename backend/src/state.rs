use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::store::{MemoryStore, RedisStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, jwt_secret: &str) -> Self {
        Self {
            store,
            jwt_secret: Arc::from(jwt_secret),
        }
    }

    pub fn in_memory(jwt_secret: &str) -> Self {
        Self::new(Arc::new(MemoryStore::new()), jwt_secret)
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let store: Arc<dyn Store> = match &config.redis_url {
            Some(url) => {
                tracing::info!("Redis URL: {url}");
                Arc::new(RedisStore::open(url)?)
            }
            None => {
                tracing::info!("REDIS_URL not set, keeping data in memory");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(store, &config.jwt_secret))
    }
}
