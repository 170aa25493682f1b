// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors reading a transcript file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Transcript file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied reading transcript: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors during session discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    #[error("IO error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Profile already configured: {path}")]
    DuplicateProfile { path: String },

    #[error("Profile not found: {path}")]
    ProfileNotFound { path: String },

    #[error("Malformed config file {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("IO error on config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
