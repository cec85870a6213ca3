use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{StorageTokenStore, TokenStore};
use crate::browser::{History, Location, Navigator};
use crate::config::config;
use crate::guard::DomainPolicy;
use crate::shell::Shell;
use crate::storage::FileStorage;

pub const DEFAULT_APP_URL: &str = "http://localhost:5173/";
const RECENTS_LIMIT: usize = 10;

/// Where the headless browser currently "is", persisted between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub current_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub recents: Vec<String>,
}

impl EnvironmentConfig {
    /// Remember `location` without its fragment, which may hold credentials.
    pub fn visit(&mut self, location: &Location) {
        let url = format!("{}{}", location.origin(), location.route_path());
        self.recents.retain(|r| r != &location.origin());
        self.recents.insert(0, location.origin());
        self.recents.truncate(RECENTS_LIMIT);
        self.current_url = Some(url);
        self.updated_at = Some(Utc::now());
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = config().config_dir()?;
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }
    Ok(config_dir)
}

pub fn load_environment_config() -> anyhow::Result<EnvironmentConfig> {
    let env_file = get_config_dir()?.join("env.json");

    if !env_file.exists() {
        return Ok(EnvironmentConfig::default());
    }

    let content = fs::read_to_string(env_file)?;
    let config: EnvironmentConfig = serde_json::from_str(&content)?;
    Ok(config)
}

pub fn save_environment_config(config: &EnvironmentConfig) -> anyhow::Result<()> {
    let env_file = get_config_dir()?.join("env.json");
    let content = serde_json::to_string_pretty(config)?;
    fs::write(env_file, content)?;
    Ok(())
}

/// Explicit URL, else the last visited one, else the local dev server.
pub fn resolve_url(explicit: Option<String>) -> anyhow::Result<String> {
    if let Some(url) = explicit {
        return Ok(url);
    }
    Ok(load_environment_config()?
        .current_url
        .unwrap_or_else(|| DEFAULT_APP_URL.to_string()))
}

/// Token store scoped to the origin of `location`.
pub fn token_store_for(location: &Location) -> anyhow::Result<Arc<dyn TokenStore>> {
    let storage = FileStorage::for_origin(&get_config_dir()?, &location.origin())?;
    Ok(Arc::new(StorageTokenStore::new(storage)))
}

pub fn shell_at(href: &str) -> anyhow::Result<Shell<History>> {
    let history = History::new(href)?;
    let tokens = token_store_for(history.location())?;
    Ok(Shell::new(history, tokens, DomainPolicy::from_config(&config().domain)))
}

pub fn remember(location: &Location) -> anyhow::Result<()> {
    let mut env = load_environment_config()?;
    env.visit(location);
    save_environment_config(&env)
}
