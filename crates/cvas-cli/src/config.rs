use anyhow::Result;
use cvas_session::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvasConfig {
    pub data_dir: PathBuf,
    pub api: ApiConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_days: i64,
    /// Whether the session files may hold secure-only cookies
    pub secure_context: bool,
}

impl Default for CvasConfig {
    fn default() -> Self {
        Self::from_session_defaults(Config::from_env())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        CvasConfig::default().api
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        CvasConfig::default().session
    }
}

impl CvasConfig {
    fn from_session_defaults(session: Config) -> Self {
        Self {
            data_dir: dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("cvas"),
            api: ApiConfig {
                base_url: session.api_base_url,
                request_timeout_secs: session.request_timeout_secs,
            },
            session: SessionConfig {
                ttl_days: session.session_ttl_days,
                secure_context: session.secure_context,
            },
        }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Where `config init` writes when no path is given
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("cvas").join("config.toml")
    }

    pub fn resolve_config(cli_config: Option<PathBuf>, cli_data_dir: Option<PathBuf>) -> Result<Self> {
        Self::resolve_with(cli_config, cli_data_dir, |key| std::env::var(key).ok())
    }

    /// Flag, then environment, then defaults. `lookup` stands in for the environment.
    pub fn resolve_with(cli_config: Option<PathBuf>, cli_data_dir: Option<PathBuf>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = if let Some(config_path) = cli_config {
            Self::load_from_file(config_path)?
        } else if let Some(env_config) = lookup("CVAS_CONFIG") {
            Self::load_from_file(env_config)?
        } else {
            Self::from_session_defaults(Config::from_lookup(&lookup))
        };

        // CLI data_dir overrides environment settings
        if let Some(data_dir) = cli_data_dir {
            config.data_dir = data_dir;
        } else if let Some(env_data_dir) = lookup("CVAS_DATA_DIR") {
            config.data_dir = PathBuf::from(env_data_dir);
        }

        std::fs::create_dir_all(&config.data_dir)?;
        Ok(config)
    }

    /// Session layer settings
    pub fn session_config(&self) -> Config {
        Config {
            api_base_url: self.api.base_url.clone(),
            request_timeout_secs: self.api.request_timeout_secs,
            session_ttl_days: self.session.ttl_days,
            secure_context: self.session.secure_context,
        }
    }

    pub fn session_dir(&self) -> PathBuf {
        self.data_dir.join("session")
    }
}
