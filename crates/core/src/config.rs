// crates/core/src/config.rs
//! On-disk configuration: directory profiles, pins, custom tags, server port.
//!
//! Callers hold an immutable [`ConfigSnapshot`] and pass it explicitly to
//! discovery/search; there is no module-level cache. Every mutation rewrites
//! the file and hands back a fresh snapshot.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 9847;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "TRAILVIEW_CONFIG";

const DEFAULT_COLOR: &str = "#7c3aed";

/// Transcript layout flavor of a directory profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryKind {
    #[default]
    Claude,
    Codex,
}

/// One user-configured transcript directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryProfile {
    pub path: String,
    pub label: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(rename = "type", default)]
    pub kind: DirectoryKind,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_enabled() -> bool {
    true
}

/// Partial update for a directory profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryUpdate {
    pub path: Option<String>,
    pub label: Option<String>,
    pub color: Option<String>,
    pub enabled: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<DirectoryKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// An immutable view of the whole configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    #[serde(default = "default_directories")]
    pub directories: Vec<DirectoryProfile>,
    #[serde(default)]
    pub pins: Vec<String>,
    #[serde(default)]
    pub custom_tags: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            directories: default_directories(),
            pins: Vec::new(),
            custom_tags: HashMap::new(),
            server: ServerConfig::default(),
        }
    }
}

fn default_directories() -> Vec<DirectoryProfile> {
    let path = dirs::home_dir()
        .map(|h| h.join(".claude").join("projects"))
        .unwrap_or_else(|| PathBuf::from(".claude/projects"));
    vec![DirectoryProfile {
        path: path.to_string_lossy().into_owned(),
        label: "Default".to_string(),
        color: DEFAULT_COLOR.to_string(),
        enabled: true,
        kind: DirectoryKind::Claude,
    }]
}

impl ConfigSnapshot {
    /// Profiles the aggregator actually scans.
    pub fn enabled_directories(&self) -> impl Iterator<Item = &DirectoryProfile> {
        self.directories.iter().filter(|d| d.enabled)
    }

    pub fn is_pinned(&self, session_id: &str) -> bool {
        self.pins.iter().any(|id| id == session_id)
    }

    pub fn custom_tags_for(&self, session_id: &str) -> &[String] {
        self.custom_tags
            .get(session_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Handle on the config file. Cheap to clone; owns no cached state.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `$TRAILVIEW_CONFIG`, falling back to the default location.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.is_empty() => Ok(Self::new(path)),
            _ => Ok(Self::new(Self::default_path()?)),
        }
    }

    /// `~/.config/trailview/config.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
        Ok(home.join(".config").join("trailview").join("config.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load a fresh snapshot. A missing file yields defaults; a corrupt one
    /// is logged and replaced by defaults rather than taking the server down.
    pub async fn load(&self) -> Result<ConfigSnapshot, ConfigError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ConfigSnapshot::default());
            }
            Err(e) => return Err(ConfigError::io(&self.path, e)),
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Malformed config, using defaults");
                Ok(ConfigSnapshot::default())
            }
        }
    }

    /// Persist a snapshot, creating parent directories as needed.
    pub async fn save(&self, snapshot: &ConfigSnapshot) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::io(parent, e))?;
        }
        let raw = serde_json::to_string_pretty(snapshot).map_err(|e| ConfigError::Malformed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| ConfigError::io(&self.path, e))
    }

    /// Write the default config if no file exists yet.
    pub async fn init(&self) -> Result<(), ConfigError> {
        if tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| ConfigError::io(&self.path, e))?
        {
            return Ok(());
        }
        self.save(&ConfigSnapshot::default()).await
    }

    // ------------------------------------------------------------------
    // Pins
    // ------------------------------------------------------------------

    pub async fn add_pin(&self, session_id: &str) -> Result<ConfigSnapshot, ConfigError> {
        let mut snapshot = self.load().await?;
        if !snapshot.is_pinned(session_id) {
            snapshot.pins.push(session_id.to_string());
            self.save(&snapshot).await?;
        }
        Ok(snapshot)
    }

    pub async fn remove_pin(&self, session_id: &str) -> Result<ConfigSnapshot, ConfigError> {
        let mut snapshot = self.load().await?;
        snapshot.pins.retain(|id| id != session_id);
        self.save(&snapshot).await?;
        Ok(snapshot)
    }

    // ------------------------------------------------------------------
    // Custom tags
    // ------------------------------------------------------------------

    pub async fn add_custom_tags(
        &self,
        session_id: &str,
        tags: &[String],
    ) -> Result<ConfigSnapshot, ConfigError> {
        let mut snapshot = self.load().await?;
        let entry = snapshot.custom_tags.entry(session_id.to_string()).or_default();
        for tag in tags {
            if !entry.contains(tag) {
                entry.push(tag.clone());
            }
        }
        self.save(&snapshot).await?;
        Ok(snapshot)
    }

    pub async fn remove_custom_tag(
        &self,
        session_id: &str,
        tag: &str,
    ) -> Result<ConfigSnapshot, ConfigError> {
        let mut snapshot = self.load().await?;
        if let Some(tags) = snapshot.custom_tags.get_mut(session_id) {
            tags.retain(|t| t != tag);
            if tags.is_empty() {
                snapshot.custom_tags.remove(session_id);
            }
            self.save(&snapshot).await?;
        }
        Ok(snapshot)
    }

    // ------------------------------------------------------------------
    // Directory profiles
    // ------------------------------------------------------------------

    pub async fn add_directory(
        &self,
        profile: DirectoryProfile,
    ) -> Result<ConfigSnapshot, ConfigError> {
        let mut snapshot = self.load().await?;
        if snapshot.directories.iter().any(|d| d.path == profile.path) {
            return Err(ConfigError::DuplicateProfile { path: profile.path });
        }
        snapshot.directories.push(profile);
        self.save(&snapshot).await?;
        Ok(snapshot)
    }

    pub async fn update_directory(
        &self,
        path: &str,
        updates: DirectoryUpdate,
    ) -> Result<ConfigSnapshot, ConfigError> {
        let mut snapshot = self.load().await?;
        let profile = snapshot
            .directories
            .iter_mut()
            .find(|d| d.path == path)
            .ok_or_else(|| ConfigError::ProfileNotFound { path: path.to_string() })?;

        if let Some(new_path) = updates.path {
            profile.path = new_path;
        }
        if let Some(label) = updates.label {
            profile.label = label;
        }
        if let Some(color) = updates.color {
            profile.color = color;
        }
        if let Some(enabled) = updates.enabled {
            profile.enabled = enabled;
        }
        if let Some(kind) = updates.kind {
            profile.kind = kind;
        }

        self.save(&snapshot).await?;
        Ok(snapshot)
    }

    pub async fn remove_directory(&self, path: &str) -> Result<ConfigSnapshot, ConfigError> {
        let mut snapshot = self.load().await?;
        snapshot.directories.retain(|d| d.path != path);
        self.save(&snapshot).await?;
        Ok(snapshot)
    }
}
