//! Centralized configuration for the COMPADRE helper.
//!
//! Constant groups cover segment filtering, the socket protocol and the
//! estimator bridge. Runtime settings are assembled from the command line and
//! the environment.

use std::path::{Path, PathBuf};

/// Segment filtering and file layout.
pub struct SegmentConfig;

impl SegmentConfig {
    /// Segments shorter than this (after rounding) never enter the index.
    pub const MIN_SEGMENT_CM: f64 = 5.0;
    /// Column count of the IBD1/2-annotated format (with header).
    pub const ANNOTATED_COLUMNS: usize = 7;
    /// Column count of the germline formats (no header).
    pub const GERMLINE_COLUMNS: usize = 6;
    /// Tab-field count identifying a germline1 line.
    pub const GERMLINE1_FIELDS: usize = 11;
    /// Directory created next to the segment file for estimator output.
    pub const ERSA_DIR_NAME: &'static str = "ersa";
    /// File stem used for the full-population run.
    pub const BULK_OUTPUT_STEM: &'static str = "output_all_ersa";
}

/// Socket protocol constants.
pub struct ProtocolConfig;

impl ProtocolConfig {
    pub const MAX_MESSAGE_SIZE: usize = 1024;
    pub const FIELD_SEPARATOR: char = '|';
    pub const CLOSE_MESSAGE: &'static str = "close";
    pub const CLOSE_ACK: &'static str = "Closing server";
    pub const BULK_MARKER: &'static str = "padre";
    pub const PAIRWISE_FIELDS: usize = 4;
    pub const ERROR_PREFIX: &'static str = "ERROR: ";
    pub const HOST_ENV: &'static str = "COMPADRE_HOST";
    pub const DEFAULT_HOST: &'static str = "localhost";
}

/// Estimator bridge constants.
pub struct EstimatorConfig;

impl EstimatorConfig {
    pub const PYTHON_ENV: &'static str = "COMPADRE_PYTHON";
    pub const DEFAULT_PYTHON: &'static str = "python3";
    pub const SCRIPTS_DIR_NAME: &'static str = "compadre-scripts";
    pub const BRIDGE_SCRIPT_NAME: &'static str = "ersa_bridge.py";
}

/// Where the server binds and which segment file it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub match_file: PathBuf,
}

impl ServerSettings {
    /// Build settings, taking the bind host from `COMPADRE_HOST` when set.
    pub fn from_env(match_file: impl Into<PathBuf>, port: u16) -> Self {
        Self::with_host(match_file, port, std::env::var(ProtocolConfig::HOST_ENV).ok())
    }

    /// Build settings with an explicit host override.
    pub fn with_host(match_file: impl Into<PathBuf>, port: u16, host: Option<String>) -> Self {
        Self {
            host: host
                .filter(|h| !h.trim().is_empty())
                .unwrap_or_else(|| ProtocolConfig::DEFAULT_HOST.to_string()),
            port,
            match_file: match_file.into(),
        }
    }
}

/// Estimator output directory for a segment file.
pub fn ersa_dir_for(match_file: &Path) -> PathBuf {
    match_file
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(SegmentConfig::ERSA_DIR_NAME)
}

/// How the estimator bridge subprocess is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    pub python: PathBuf,
    pub scripts_dir: PathBuf,
}

impl BridgeSettings {
    /// Interpreter from `COMPADRE_PYTHON`, scripts under the system temp dir.
    pub fn from_env() -> Self {
        let python = std::env::var_os(EstimatorConfig::PYTHON_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(EstimatorConfig::DEFAULT_PYTHON));
        Self {
            python,
            scripts_dir: std::env::temp_dir().join(EstimatorConfig::SCRIPTS_DIR_NAME),
        }
    }

    pub fn bridge_script(&self) -> PathBuf {
        self.scripts_dir.join(EstimatorConfig::BRIDGE_SCRIPT_NAME)
    }
}
