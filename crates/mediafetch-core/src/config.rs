use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Store write retry parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per store operation (including the first).
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on each further attempt.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 100,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }
}

/// How to launch the external extraction tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Executable name or path (looked up on PATH).
    pub program: String,
    /// Arguments placed before everything else, e.g. `["-m", "yt_dlp"]` with `program = "python3"`.
    #[serde(default)]
    pub prefix_args: Vec<String>,
    /// User agent passed to the tool, if any.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Extra arguments appended after the built-in flags and before the URL.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            prefix_args: Vec::new(),
            user_agent: None,
            extra_args: Vec::new(),
        }
    }
}

/// Global configuration loaded from `~/.config/mediafetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediafetchConfig {
    /// Directory the tool writes finished files into. None = XDG data dir.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Maximum number of jobs running at once; further jobs wait for a slot.
    pub max_concurrent_jobs: usize,
    /// Upper bound on the metadata-only tool invocation.
    pub metadata_timeout_secs: u64,
    /// How long shutdown waits for in-flight jobs before aborting them.
    pub shutdown_grace_secs: u64,
    /// Extraction tool invocation; if missing, `yt-dlp` on PATH is used.
    #[serde(default)]
    pub tool: Option<ToolConfig>,
    /// Optional store retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Hosts accepted at intake. None = built-in video hosts, empty = any http(s) host.
    #[serde(default)]
    pub allowed_hosts: Option<Vec<String>>,
}

impl Default for MediafetchConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            max_concurrent_jobs: 4,
            metadata_timeout_secs: 60,
            shutdown_grace_secs: 10,
            tool: None,
            retry: None,
            allowed_hosts: None,
        }
    }
}

impl MediafetchConfig {
    pub fn tool(&self) -> ToolConfig {
        self.tool.clone().unwrap_or_default()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default().policy()
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Configured output directory, or `~/.local/share/mediafetch/downloads`.
    pub fn resolve_output_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.output_dir {
            return Ok(dir.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("mediafetch")?;
        Ok(xdg_dirs.get_data_home().join("downloads"))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mediafetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MediafetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MediafetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: MediafetchConfig = toml::from_str(&data)?;
    Ok(cfg)
}
