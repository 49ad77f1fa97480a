use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// HTTP fetch timeouts (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-transfer timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            timeout_secs: 3600,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// S3 client overrides. Credentials always come from the standard AWS provider chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Config {
    /// Region override (e.g. "us-east-1"); falls back to the environment/profile.
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint, e.g. a MinIO or localstack URL.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Use path-style addressing (`endpoint/bucket/key`), needed by most S3 emulators.
    #[serde(default)]
    pub force_path_style: bool,
}

/// Where `s3://` locators are read from and sidecars are written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Real S3 (or an S3-compatible endpoint).
    #[default]
    S3,
    /// Local directory laid out as `<mirror_root>/<bucket>/<key>`.
    Mirror,
}

/// Global configuration loaded from `~/.config/sidecar/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidecarConfig {
    /// Directory where remote inputs are downloaded. Defaults to the XDG cache dir.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
    /// Keep downloaded inputs after processing instead of removing them in cleanup.
    #[serde(default)]
    pub keep_downloads: bool,
    /// Storage backend for `s3://` locators.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory for the mirror backend.
    #[serde(default)]
    pub mirror_root: Option<PathBuf>,
    /// Poll interval of the local activity loop, in milliseconds.
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub s3: S3Config,
    /// Extra or overriding input-key patterns (name -> regex).
    #[serde(default)]
    pub input_keys: BTreeMap<String, String>,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            keep_downloads: false,
            backend: StorageBackend::S3,
            mirror_root: None,
            poll_interval_ms: 1000,
            http: HttpConfig::default(),
            s3: S3Config::default(),
            input_keys: BTreeMap::new(),
        }
    }
}

impl SidecarConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Work directory for downloads: the configured one, else `~/.cache/sidecar/work`.
    pub fn resolved_work_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.work_dir {
            return Ok(dir.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("sidecar")?;
        Ok(xdg_dirs.get_cache_home().join("sidecar").join("work"))
    }

    /// Mirror root, required when `backend = "mirror"`.
    pub fn resolved_mirror_root(&self) -> Result<&Path> {
        self.mirror_root
            .as_deref()
            .context("backend = \"mirror\" requires mirror_root in config.toml")
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("sidecar")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from an explicit path. The file must exist.
pub fn load_from(path: &Path) -> Result<SidecarConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: SidecarConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SidecarConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SidecarConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from(&path)
}
