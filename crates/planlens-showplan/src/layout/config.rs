//! Layout metrics
//!
//! All sizes are in canvas units. Every field may be omitted from a TOML
//! file, in which case the default applies:
//!
//! ```toml
//! padding = 20.0
//! horizontal_spacing = 180.0
//! vertical_spacing = 20.0
//! node_width = 150.0
//! icon_size = 32.0
//! line_height = 14.0
//! node_padding = 10.0
//! min_node_height = 60.0
//! ```
//!
//! Values must be finite and non-negative; `horizontal_spacing` and
//! `node_width` must be positive so every child lies right of its parent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading a layout configuration
#[derive(Debug, Error)]
pub enum LayoutConfigError {
    #[error("Invalid layout TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid layout value {field} = {value}: must be {requirement}")]
    InvalidValue {
        field: &'static str,
        value: f64,
        requirement: &'static str,
    },
}

/// Spacing and sizing used by [`super::LayoutEngine`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Margin around the whole diagram
    pub padding: f64,
    /// Distance between the left edges of a parent and its children
    pub horizontal_spacing: f64,
    /// Gap between vertically adjacent leaves
    pub vertical_spacing: f64,
    pub node_width: f64,
    pub icon_size: f64,
    /// Height of one line of node text
    pub line_height: f64,
    pub node_padding: f64,
    /// No node is drawn shorter than this
    pub min_node_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: 20.0,
            horizontal_spacing: 180.0,
            vertical_spacing: 20.0,
            node_width: 150.0,
            icon_size: 32.0,
            line_height: 14.0,
            node_padding: 10.0,
            min_node_height: 60.0,
        }
    }
}

impl LayoutConfig {
    /// Parses a configuration from TOML; missing keys take their defaults
    pub fn from_toml(source: &str) -> Result<Self, LayoutConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every metric against its allowed range
    pub fn validate(&self) -> Result<(), LayoutConfigError> {
        let positive = [
            ("horizontal_spacing", self.horizontal_spacing),
            ("node_width", self.node_width),
        ];
        let non_negative = [
            ("padding", self.padding),
            ("vertical_spacing", self.vertical_spacing),
            ("icon_size", self.icon_size),
            ("line_height", self.line_height),
            ("node_padding", self.node_padding),
            ("min_node_height", self.min_node_height),
        ];

        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(LayoutConfigError::InvalidValue {
                    field,
                    value,
                    requirement: "a finite number greater than zero",
                });
            }
        }
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(LayoutConfigError::InvalidValue {
                    field,
                    value,
                    requirement: "a finite number of at least zero",
                });
            }
        }
        Ok(())
    }
}
