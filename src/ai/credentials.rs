use std::sync::{Arc, RwLock};

use crate::config::AppConfig;

/// Source of the bearer token for the organize service.
/// Sign-in and refresh are owned elsewhere; this only reads the current token.
pub trait AccessTokenSource: Send + Sync {
    fn get_access_token(&self) -> Option<String>;
}

/// Reads the token from the shared app config, so a sign-in or sign-out
/// elsewhere is picked up by the next organize run
#[derive(Clone)]
pub struct ConfigTokenSource {
    config: Arc<RwLock<AppConfig>>,
}

impl ConfigTokenSource {
    pub fn new(config: Arc<RwLock<AppConfig>>) -> Self {
        Self { config }
    }
}

impl AccessTokenSource for ConfigTokenSource {
    fn get_access_token(&self) -> Option<String> {
        let config = self.config.read().unwrap_or_else(|e| e.into_inner());
        config
            .access_token
            .as_ref()
            .filter(|t| !t.trim().is_empty())
            .cloned()
    }
}

/// Fixed token, for the CLI `--token` flag
#[derive(Debug, Clone)]
pub struct StaticToken(pub Option<String>);

impl AccessTokenSource for StaticToken {
    fn get_access_token(&self) -> Option<String> {
        self.0.clone()
    }
}
