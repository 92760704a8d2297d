//! Client configuration.
//!
//! Reads/writes JSON at `~/.config/crosspost/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crosspost_protocol::{Platform, PlatformRegistry};
use serde::{Deserialize, Serialize};

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_DROP_POLL_MS: u64 = 1000;

/// On-disk config format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    server_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    idle_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    drop_dir: Option<PathBuf>,
    #[serde(default)]
    drop_poll_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    platforms: Option<Vec<Platform>>,
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the posting service.
    pub server_url: String,
    /// Give up on a silent progress channel after this many seconds.
    pub idle_timeout_secs: Option<u64>,
    /// Directory watched by `crosspost watch`.
    pub drop_dir: Option<PathBuf>,
    pub drop_poll_ms: u64,
    /// Replaces the built-in platform list when set.
    pub platforms: Option<Vec<Platform>>,
    pub(crate) file_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            idle_timeout_secs: None,
            drop_dir: None,
            drop_poll_ms: DEFAULT_DROP_POLL_MS,
            platforms: None,
            file_path: default_config_path(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from `path`, or the default location.
    ///
    /// A missing file yields defaults. An unparsable one is logged and
    /// replaced by defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file_path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        let mut config = ClientConfig {
            file_path: file_path.clone(),
            ..Default::default()
        };

        if file_path.exists() {
            let content = std::fs::read_to_string(&file_path)?;
            if let Ok(file) = serde_json::from_str::<ConfigFile>(&content) {
                if !file.server_url.is_empty() {
                    config.server_url = file.server_url;
                }
                config.idle_timeout_secs = file.idle_timeout_secs.filter(|s| *s > 0);
                config.drop_dir = file.drop_dir;
                if file.drop_poll_ms >= 50 {
                    config.drop_poll_ms = file.drop_poll_ms;
                }
                config.platforms = file.platforms.filter(|p| !p.is_empty());
            } else {
                tracing::warn!(
                    path = %file_path.display(),
                    "failed to parse client config, using defaults"
                );
            }
        }

        Ok(config)
    }

    /// Saves configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = ConfigFile {
            server_url: self.server_url.clone(),
            idle_timeout_secs: self.idle_timeout_secs,
            drop_dir: self.drop_dir.clone(),
            drop_poll_ms: self.drop_poll_ms,
            platforms: self.platforms.clone(),
        };

        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.file_path, &json)?;
        set_permissions_0600(&self.file_path);

        tracing::debug!(path = %self.file_path.display(), "client configuration saved");
        Ok(())
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }

    pub fn drop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.drop_poll_ms)
    }

    /// The configured platforms, or the built-in registry.
    pub fn registry(&self) -> anyhow::Result<PlatformRegistry> {
        match &self.platforms {
            Some(platforms) => Ok(PlatformRegistry::new(platforms.clone())?),
            None => Ok(PlatformRegistry::builtin()),
        }
    }
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

fn default_config_path() -> PathBuf {
    config_base_dir().join("crosspost").join("config.json")
}

fn config_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config")
    }
}
