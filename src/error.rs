use std::path::PathBuf;
use thiserror::Error;

use crate::mapping::Mapping;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ADO API error {status} {reason} (after {attempts} attempt(s))\nURL: {url}\nResponse: {excerpt}")]
    Api {
        status: u16,
        reason: String,
        url: String,
        excerpt: String,
        attempts: u32,
    },

    #[error("Failed to connect to ADO organization '{organization}': {source}")]
    Connectivity {
        organization: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error("Duplicate {level} key '{key}' in the breakdown; give each {level} a unique id")]
    DuplicateKey { level: &'static str, key: String },

    #[error("Failed to create {item}: {source}")]
    PartialItemFailure {
        item: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error("Push aborted while creating {item} ({} item(s) already created): {source}", mapping.created_count())]
    Aborted {
        item: String,
        mapping: Box<Mapping>,
        #[source]
        source: Box<SyncError>,
    },

    #[error("Malformed artifact at {path}: {source}")]
    MalformedArtifact {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to save config file at {path}: {source}")]
    ConfigSave {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error(
        "ADO not configured. Missing: {}. Set them in ado-sync.toml ([ado] table) or via ADO_ORGANIZATION / ADO_PROJECT / ADO_PAT",
        missing.join(", ")
    )]
    MissingCredentials { missing: Vec<&'static str> },

    #[error("Figma PAT not configured. Add pat to the [figma] table or set FIGMA_PAT")]
    MissingFigmaToken,

    #[error("Could not extract file key from Figma URL: {0} (expected https://www.figma.com/design/ABC123/Name)")]
    InvalidFigmaLink(String),

    #[error("No frames found in Figma file {0}")]
    NoFrames(String),

    #[error("No breakdown found. Expected push_ready.json or breakdown.json in {0}")]
    NoDataSource(PathBuf),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unexpected response from {url}: {message}")]
    UnexpectedResponse { url: String, message: String },
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// HTTP status of a completed-but-unsuccessful exchange, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Api { status, .. } => Some(*status),
            SyncError::Connectivity { source, .. }
            | SyncError::PartialItemFailure { source, .. }
            | SyncError::Aborted { source, .. } => source.status(),
            _ => None,
        }
    }
}
