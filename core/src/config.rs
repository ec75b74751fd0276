use std::fs;
use std::path::Path;
use std::time::Duration;

use ron::de::from_str;
use ron::ser::{to_string_pretty, PrettyConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, StorageAction};
use crate::targets;

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "fichedesk.ron";

const DEFAULT_INACTIVITY_TIMEOUT_SECS: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// On-disk application settings. The store credentials are the hosted
/// project's public URL and anon key; real privileges come from the signed-in
/// session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub store_url: String,
    pub api_key: String,
    /// Only this account may confirm record deletion.
    pub authorized_deleter: String,
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_inactivity_timeout_secs() -> u64 {
    DEFAULT_INACTIVITY_TIMEOUT_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_url: String::new(),
            api_key: String::new(),
            authorized_deleter: String::new(),
            inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn load_config(path: &Path) -> Result<AppConfig, Error> {
    let contents = fs::read_to_string(path).map_err(|source| Error::ConfigIo {
        action: StorageAction::Load,
        path: Some(path.display().to_string()),
        source,
    })?;
    let config: AppConfig = from_str(&contents).map_err(|source| Error::Ron {
        action: StorageAction::Load,
        path: Some(path.display().to_string()),
        source: source.into(),
    })?;
    info!(target: targets::CONFIG, path = %path.display(), "Configuration loaded");
    Ok(config)
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), Error> {
    let contents =
        to_string_pretty(config, PrettyConfig::new()).map_err(|source| Error::Ron {
            action: StorageAction::Save,
            path: Some(path.display().to_string()),
            source,
        })?;
    fs::write(path, contents).map_err(|source| Error::ConfigIo {
        action: StorageAction::Save,
        path: Some(path.display().to_string()),
        source,
    })?;
    info!(target: targets::CONFIG, path = %path.display(), "Configuration saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrips_through_disk() {
        let dir = std::env::temp_dir().join("fichedesk-config-roundtrip");
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join(DEFAULT_CONFIG_PATH);

        let config = AppConfig {
            store_url: "https://project.example.co".to_string(),
            api_key: "anon-key".to_string(),
            authorized_deleter: "director@example.org".to_string(),
            inactivity_timeout_secs: 90,
            request_timeout_secs: 5,
        };
        save_config(&path, &config).expect("save");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, config);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_timeouts_fall_back_to_defaults() {
        let raw = r#"(
            store_url: "https://project.example.co",
            api_key: "anon-key",
            authorized_deleter: "director@example.org",
        )"#;
        let config: AppConfig = from_str(raw).expect("parse");
        assert_eq!(config.inactivity_timeout(), Duration::from_secs(60));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn missing_file_reports_load_action() {
        let error = load_config(Path::new("/nonexistent/fichedesk.ron")).expect_err("missing");
        match error {
            Error::ConfigIo { action, .. } => assert_eq!(action, StorageAction::Load),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
