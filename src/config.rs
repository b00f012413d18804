use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SelectorError};
use crate::geometry::OffsetAxes;
use crate::loader::DEFAULT_IMAGE_URI;
use crate::surface::StrokeStyle;

/// Selector settings. Missing fields in a config file take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Loaded when `load_image` is called without a uri.
    pub default_uri: String,

    /// Outline of the selection rectangle.
    pub stroke: StrokeStyle,

    pub offset_axes: OffsetAxes,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            default_uri: DEFAULT_IMAGE_URI.to_owned(),
            stroke: StrokeStyle::default(),
            offset_axes: OffsetAxes::default(),
        }
    }
}

impl SelectorConfig {
    /// # Errors
    /// [`SelectorError::Config`] when `json` is malformed or holds an
    /// unknown value.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SelectorError::Config(e.to_string()))
    }

    /// Reads a JSON config file.
    ///
    /// # Errors
    /// [`SelectorError::Config`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| SelectorError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }
}
