use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub domain: DomainConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Controls how hostnames are classified by the route guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// The marketing/auth domain, e.g. `statuswatch.example.com`.
    pub root_domain: Option<String>,
    /// When set, the public domain only serves home, login and register.
    pub enforce_public_gate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub config_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("STATUSWATCH_API_URL") {
            self.api.base_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("STATUSWATCH_API_TIMEOUT_SECS") {
            self.api.timeout_secs = v.parse().unwrap_or(self.api.timeout_secs);
        }

        if let Ok(v) = env::var("STATUSWATCH_ROOT_DOMAIN") {
            let v = v.trim().to_ascii_lowercase();
            self.domain.root_domain = if v.is_empty() { None } else { Some(v) };
        }
        if let Ok(v) = env::var("STATUSWATCH_ENFORCE_PUBLIC_DOMAIN") {
            self.domain.enforce_public_gate = v.parse().unwrap_or(self.domain.enforce_public_gate);
        }

        if let Ok(v) = env::var("STATUSWATCH_CONFIG_DIR") {
            self.storage.config_dir = Some(PathBuf::from(v));
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 30,
            },
            domain: DomainConfig {
                root_domain: None,
                // Every tenant shares localhost in development
                enforce_public_gate: false,
            },
            storage: StorageConfig { config_dir: None },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                base_url: "https://api.staging.statuswatch.example.com".to_string(),
                timeout_secs: 15,
            },
            domain: DomainConfig {
                root_domain: Some("staging.statuswatch.example.com".to_string()),
                enforce_public_gate: true,
            },
            storage: StorageConfig { config_dir: None },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: "https://api.statuswatch.example.com".to_string(),
                timeout_secs: 10,
            },
            domain: DomainConfig {
                root_domain: Some("statuswatch.example.com".to_string()),
                enforce_public_gate: true,
            },
            storage: StorageConfig { config_dir: None },
        }
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        match self.environment {
            Environment::Development => "statuswatch_client=debug,info",
            Environment::Staging => "info",
            Environment::Production => "warn",
        }
    }

    /// Directory holding per-origin storage files.
    pub fn config_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.storage.config_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let home = env::var("HOME")
                    .map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
                Ok(PathBuf::from(home).join(".config").join("statuswatch"))
            }
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
