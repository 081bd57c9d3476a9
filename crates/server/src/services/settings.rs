use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::watch;

use crate::config::Config;
use crate::models::Settings;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Receiver for settings changes
pub type SettingsWatcher = watch::Receiver<Settings>;

pub struct SettingsService {
    settings_path: PathBuf,
    sender: watch::Sender<Settings>,
    receiver: watch::Receiver<Settings>,
}

impl SettingsService {
    /// Initialize the settings service.
    /// Creates default settings file if it doesn't exist.
    pub async fn new(config: &Config) -> Result<Self, SettingsError> {
        Self::from_path(config.settings_path()).await
    }

    pub async fn from_path(settings_path: PathBuf) -> Result<Self, SettingsError> {
        let settings = Self::load_or_create(&settings_path).await?;
        let (sender, receiver) = watch::channel(settings);

        Ok(Self {
            settings_path,
            sender,
            receiver,
        })
    }

    /// Settings held only in memory, for tests and embedding.
    pub fn in_memory(settings: Settings) -> Self {
        let (sender, receiver) = watch::channel(settings.normalized());
        Self {
            settings_path: PathBuf::new(),
            sender,
            receiver,
        }
    }

    /// Load settings from file, or create with defaults if file doesn't exist.
    async fn load_or_create(path: &Path) -> Result<Settings, SettingsError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let settings: Settings = toml::from_str(&content)?;
                Ok(settings.normalized())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }

                let default = Settings::default();
                let toml_str = toml::to_string_pretty(&default)?;
                tokio::fs::write(path, toml_str).await?;
                tracing::info!("Created default settings at {}", path.display());
                Ok(default)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get current settings (fast, no I/O).
    pub fn get(&self) -> Settings {
        self.receiver.borrow().clone()
    }

    /// Subscribe to settings changes.
    pub fn subscribe(&self) -> SettingsWatcher {
        self.receiver.clone()
    }

    /// Replace the settings, persist them and notify subscribers.
    pub async fn update(&self, settings: Settings) -> Result<Settings, SettingsError> {
        let settings = settings.normalized();

        if !self.settings_path.as_os_str().is_empty() {
            self.save_to_file(&settings).await?;
        }

        // Ignore error if no receivers
        let _ = self.sender.send(settings.clone());

        Ok(settings)
    }

    /// Save settings to TOML file atomically (write temp, then rename).
    async fn save_to_file(&self, settings: &Settings) -> Result<(), SettingsError> {
        let toml_str = toml::to_string_pretty(settings)?;

        let tmp_path = self.settings_path.with_extension("toml.tmp");
        tokio::fs::write(&tmp_path, &toml_str).await?;
        tokio::fs::rename(&tmp_path, &self.settings_path).await?;

        tracing::debug!("Saved settings to {}", self.settings_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DispatchMode;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "newswire-settings-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn test_creates_default_file() {
        let dir = scratch_dir("create");
        let path = dir.join("settings.toml");

        let service = SettingsService::from_path(path.clone()).await.unwrap();

        assert_eq!(service.get(), Settings::default());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[ingestion]"));
        assert!(written.contains("dedup_window_days = 30"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_update_persists_and_notifies() {
        let dir = scratch_dir("update");
        let path = dir.join("settings.toml");
        let service = SettingsService::from_path(path.clone()).await.unwrap();
        let mut watcher = service.subscribe();

        let mut settings = service.get();
        settings.fanout.dispatch_mode = DispatchMode::Topics;
        settings.fanout.recipient_page_size = 0;
        service.update(settings).await.unwrap();

        assert!(watcher.has_changed().unwrap());
        let seen = watcher.borrow_and_update().clone();
        assert_eq!(seen.fanout.dispatch_mode, DispatchMode::Topics);
        assert_eq!(seen.fanout.recipient_page_size, 1);

        let reloaded = SettingsService::from_path(path).await.unwrap();
        assert_eq!(reloaded.get().fanout.dispatch_mode, DispatchMode::Topics);

        let _ = std::fs::remove_dir_all(dir);
    }
}
