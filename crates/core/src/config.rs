//! TOML-based configuration for the conflict-tracking engine.
//!
//! Everything has a sensible default, so `EngineConfig::default()` is a
//! fully working configuration; a TOML file only needs to override the
//! fields it cares about.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Engine configuration, loadable from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Milliseconds of quiet time before a scheduled re-scan runs.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Milliseconds of quiet time before a repository lifecycle-file event
    /// triggers a re-query of the unmerged path list.
    #[serde(default = "default_requery_debounce_ms")]
    pub requery_debounce_ms: u64,

    /// Name of the VCS binary to invoke.
    #[serde(default = "default_git_program")]
    pub git_program: String,

    /// Which marker grammar the scanner uses.
    #[serde(default)]
    pub marker_style: MarkerStyle,

    /// Highlight group names used by the decoration driver.
    #[serde(default)]
    pub highlights: HighlightConfig,

    /// Annotation text appended to header-line overlays.
    #[serde(default)]
    pub annotations: AnnotationConfig,
}

fn default_debounce_ms() -> u64 {
    50
}
fn default_requery_debounce_ms() -> u64 {
    300
}
fn default_git_program() -> String {
    "git".into()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            requery_debounce_ms: default_requery_debounce_ms(),
            git_program: default_git_program(),
            marker_style: MarkerStyle::default(),
            highlights: HighlightConfig::default(),
            annotations: AnnotationConfig::default(),
        }
    }
}

/// Marker grammar selection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MarkerStyle {
    /// Four or more repeated marker characters, labels optional.
    #[default]
    Tolerant,
    /// Exactly seven marker characters with mandatory labels.
    Exact,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        info!(path = %path.display(), "loaded engine configuration");
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Highlights
// ---------------------------------------------------------------------------

/// Highlight group names, one per marker classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightConfig {
    #[serde(default = "default_hl_current")]
    pub current: String,

    #[serde(default = "default_hl_incoming")]
    pub incoming: String,

    #[serde(default = "default_hl_delimiter")]
    pub delimiter: String,

    #[serde(default = "default_hl_header")]
    pub header: String,
}

fn default_hl_current() -> String {
    "ConflictCurrent".into()
}
fn default_hl_incoming() -> String {
    "ConflictIncoming".into()
}
fn default_hl_delimiter() -> String {
    "ConflictDelimiter".into()
}
fn default_hl_header() -> String {
    "ConflictHeader".into()
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            current: default_hl_current(),
            incoming: default_hl_incoming(),
            delimiter: default_hl_delimiter(),
            header: default_hl_header(),
        }
    }
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

/// Fixed annotation text shown after header labels in overlays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationConfig {
    #[serde(default = "default_current_annotation")]
    pub current: String,

    #[serde(default = "default_incoming_annotation")]
    pub incoming: String,
}

fn default_current_annotation() -> String {
    "(Current change)".into()
}
fn default_incoming_annotation() -> String {
    "(Incoming change)".into()
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            current: default_current_annotation(),
            incoming: default_incoming_annotation(),
        }
    }
}
