//! TOML configuration for the command line tool
//!
//! Every section is optional:
//!
//! ```toml
//! duplicate_offset = 10
//!
//! [zoom]
//! min = 0.5
//! max = 3.0
//!
//! [defaults]
//! fontSize = 16
//! fontFamily = "Times New Roman"
//!
//! [rasterizer]
//! max_surface_dimension = 4096
//! ```

use anyhow::Context;
use overlay_core::{EditorConfig, RasterizerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Editor settings, flattened to the top level of the file
    #[serde(flatten)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub rasterizer: RasterizerConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }

    /// Load `path` if given, otherwise the built-in defaults
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
