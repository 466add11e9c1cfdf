use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::fs_util::write_atomic;
use crate::token_store::{FileTokenStore, KeyringTokenStore, TokenStore};

const CONFIG_DIR_NAME: &str = "voxa";
const CONFIG_FILE_NAME: &str = "config.json";
const TOKEN_FILE_NAME: &str = "storage.json";

/// Overrides every other base URL source when set.
pub const BASE_URL_ENV: &str = "VOXA_API_URL";

/// Where the session token is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// OS secret store (native targets)
    Keyring,
    /// Key/value JSON file (web-storage style)
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Explicit backend origin, e.g. `https://api.example.com`. Takes
    /// precedence over the ngrok/local pair below.
    pub base_url: Option<String>,

    /// Route through the ngrok tunnel instead of the LAN address.
    pub use_ngrok: bool,
    pub ngrok_url: Option<String>,

    /// LAN address of the backend when not tunnelling.
    pub local_host: String,
    pub local_port: u16,

    /// Connect/response timeout for ordinary requests.
    pub request_timeout_secs: u64,

    /// Timeout for recording uploads (larger payloads).
    pub upload_timeout_secs: u64,

    /// Timeout for the reachability check.
    pub health_timeout_secs: u64,

    pub storage: StorageBackend,

    /// Token file for [`StorageBackend::File`]. Defaults to
    /// `<config_dir>/voxa/storage.json`.
    pub token_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            use_ngrok: false,
            ngrok_url: None,
            local_host: "127.0.0.1".to_string(),
            local_port: 3000,
            request_timeout_secs: 30,
            upload_timeout_secs: 60,
            health_timeout_secs: 5,
            storage: StorageBackend::Keyring,
            token_file: None,
        }
    }
}

impl ClientConfig {
    /// Config pointing straight at `base_url`, everything else default.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: Some(base_url.to_string()),
            ..Self::default()
        }
    }

    /// Backend origin, without trailing slash.
    ///
    /// Order: `VOXA_API_URL`, `base_url`, ngrok URL (when enabled), LAN address.
    pub fn resolve_base_url(&self) -> String {
        let from_env = std::env::var(BASE_URL_ENV).ok();
        self.resolve_base_url_with(from_env.as_deref())
    }

    fn resolve_base_url_with(&self, env_override: Option<&str>) -> String {
        let non_empty = |s: &&str| !s.trim().is_empty();

        let origin = env_override
            .filter(non_empty)
            .map(str::to_string)
            .or_else(|| self.base_url.as_deref().filter(non_empty).map(str::to_string))
            .or_else(|| {
                self.ngrok_url
                    .as_deref()
                    .filter(|url| self.use_ngrok && non_empty(url))
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("http://{}:{}", self.local_host, self.local_port));

        origin.trim().trim_end_matches('/').to_string()
    }

    /// `<origin>/api`, the root of every endpoint.
    pub fn api_url(&self) -> String {
        format!("{}/api", self.resolve_base_url())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    /// Open the configured token store.
    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        match self.storage {
            StorageBackend::Keyring => Arc::new(KeyringTokenStore::new()),
            StorageBackend::File => {
                let path = self
                    .token_file
                    .clone()
                    .or_else(|| config_dir().map(|dir| dir.join(TOKEN_FILE_NAME)))
                    .unwrap_or_else(|| PathBuf::from(TOKEN_FILE_NAME));
                Arc::new(FileTokenStore::new(path))
            }
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME))
}

/// `<config_dir>/voxa/config.json`
pub fn default_config_path() -> Result<PathBuf, String> {
    config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Could not determine config directory".to_string())
}

/// Load the config file, falling back to defaults when it is missing or unreadable.
pub fn load_config(path: &Path) -> ClientConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<ClientConfig>(&contents) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Config: failed to parse {:?}: {}", path, e);
                ClientConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ClientConfig::default(),
        Err(e) => {
            log::warn!("Config: failed to read {:?}: {}", path, e);
            ClientConfig::default()
        }
    }
}

pub fn save_config(path: &Path, config: &ClientConfig) -> Result<(), String> {
    let contents =
        serde_json::to_string_pretty(config).map_err(|e| format!("Serialize config: {}", e))?;
    write_atomic(path, &contents).map_err(|e| format!("Failed to save config: {}", e))
}
