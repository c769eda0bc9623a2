//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use mathtutor_session::{SessionConfig, DEFAULT_API_BASE_URL, DEFAULT_SIGN_IN_PATH};

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the database holding cookies and local storage
    pub database_path: PathBuf,
    /// Backend REST API root
    pub api_base_url: String,
    /// Where forced sign-outs land
    pub sign_in_path: String,
    /// Seconds between background session checks
    pub validation_interval_secs: u64,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("mathtutor.db"),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            validation_interval_secs: 300,
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("MathTutor"))
            .unwrap_or_else(|| PathBuf::from(".mathtutor"))
    }

    pub fn default_path() -> PathBuf {
        Self::data_dir().join("config.json")
    }

    /// Read a JSON config file. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn validation_interval(&self) -> Duration {
        Duration::from_secs(self.validation_interval_secs.max(1))
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        let mut session = SessionConfig::new(&self.api_base_url)
            .map_err(|e| CoreError::Config(e.to_string()))?;

        if !self.sign_in_path.starts_with('/') {
            return Err(CoreError::Config(format!(
                "sign_in_path must be absolute: {}",
                self.sign_in_path
            )));
        }
        session.sign_in_path = self.sign_in_path.clone();

        Ok(session)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}
