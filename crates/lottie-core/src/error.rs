//! Error types for lottie-core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`LottieError`].
pub type Result<T, E = LottieError> = std::result::Result<T, E>;

/// Configuration and usage errors surfaced to the immediate caller.
#[derive(Debug, Error)]
pub enum LottieError {
    /// Two gradients with different stop counts cannot be interpolated.
    #[error("Gradient stop count mismatch: {left} vs {right}")]
    GradientStopMismatch { left: usize, right: usize },

    /// An image has to be loaded from disk but no images folder was configured.
    #[error("Image asset '{id}' needs an images folder, but none was set")]
    MissingImagesFolder { id: String },

    /// Cache capacity must be at least one entry.
    #[error("Cache capacity must be greater than zero")]
    InvalidCacheCapacity,

    /// An animatable value was built without any keyframes.
    #[error("Animatable value has no keyframes")]
    EmptyKeyframes,

    /// A key path needs at least one segment.
    #[error("Key path must contain at least one segment")]
    EmptyKeyPath,

    /// A configuration or animation file could not be read.
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be parsed.
    #[error("Failed to parse animation document: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource fetch failure bubbled up through a configuration path.
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Failures reported by the asset fetch contract.
///
/// The render pass treats these as a missing resource and keeps drawing.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Asset '{0}' not found")]
    NotFound(String),

    #[error("Failed to read asset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode asset '{id}': {reason}")]
    Decode { id: String, reason: String },
}
