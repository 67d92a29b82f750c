//! Error types for the compositing engine

use thiserror::Error;

/// Result type alias for editor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the compositing engine
#[derive(Error, Debug)]
pub enum Error {
    /// Network failure reaching the source image
    #[error("Failed to fetch image: {0}")]
    ImageFetch(String),

    /// Retrieved bytes cannot be read as an image
    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    /// Host element unavailable or already bound to another engine
    #[error("Engine binding failed: {0}")]
    EngineBinding(String),

    /// Rendering or export failed; fatal to the editing session
    #[error("Rendering failed: {0}")]
    Render(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}
