use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            _ => Self::Dev,
        }
    }

    /// Returns the default data path for this environment
    pub fn default_data_path(&self) -> PathBuf {
        match self {
            Self::Dev => PathBuf::from("./data"),
            Self::Prod => PathBuf::from("/data"),
        }
    }
}

/// Process-level configuration, resolved once from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub env: Environment,
    pub data_path: PathBuf,
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn new(env: Environment, data_path: impl AsRef<Path>) -> Self {
        let data_path = data_path.as_ref().to_path_buf();
        let database_url = format!(
            "sqlite:{}?mode=rwc",
            data_path.join("newswire.db").display()
        );
        Self {
            env,
            data_path,
            database_url,
            max_connections: 5,
        }
    }

    /// Replace the derived SQLite location (`DATABASE_URL`).
    pub fn with_database_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = database_url.into();
        self
    }

    /// Returns the path to the tuning settings file
    pub fn settings_path(&self) -> PathBuf {
        self.data_path.join("settings.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_str() {
        assert_eq!(Environment::from_str("production"), Environment::Prod);
        assert_eq!(Environment::from_str("PROD"), Environment::Prod);
        assert_eq!(Environment::from_str(""), Environment::Dev);
    }

    #[test]
    fn test_config_paths() {
        let config = Config::new(Environment::Prod, "/data");
        assert_eq!(config.database_url, "sqlite:/data/newswire.db?mode=rwc");
        assert_eq!(config.settings_path(), PathBuf::from("/data/settings.toml"));

        let config = config.with_database_url("sqlite::memory:");
        assert_eq!(config.database_url, "sqlite::memory:");
    }
}
