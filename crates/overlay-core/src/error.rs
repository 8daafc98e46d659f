use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OverlayError {
    #[error("Failed to load PDF: {0}")]
    LoadError(String),

    #[error("Page rendering failed: {0}")]
    RenderError(String),

    #[error("Export failed: {0}")]
    ExportError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No document loaded")]
    NoDocument,

    #[error("Rasterizer has not been configured")]
    RasterizerNotConfigured,

    #[error("Rasterizer is already configured with different settings")]
    RasterizerAlreadyConfigured,
}

impl From<serde_json::Error> for OverlayError {
    fn from(e: serde_json::Error) -> Self {
        OverlayError::SerializationError(e.to_string())
    }
}
