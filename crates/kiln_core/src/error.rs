//! Error types for scene loading.

use thiserror::Error;

/// Errors that can occur while loading a glTF document into a scene.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Unsupported component type / element shape, or a read outside the
    /// backing buffer view.
    #[error("Malformed accessor {accessor}: {reason}")]
    MalformedAccessor { accessor: usize, reason: String },

    #[error("Buffer {index} unavailable ({uri}): {source}")]
    BufferUnavailable {
        index: usize,
        uri: String,
        #[source]
        source: std::io::Error,
    },

    /// The document itself or an image could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Document has no default scene ({path})")]
    NoDefaultScene { path: String },

    #[error("Extension {extension} has unexpected data: {source}")]
    UnsupportedExtensionData {
        extension: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid {field} value ({value})")]
    InvalidEnumValue { field: &'static str, value: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid GLB: {0}")]
    InvalidGlb(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Image {index} could not be decoded: {source}")]
    Image {
        index: usize,
        #[source]
        source: image::ImageError,
    },

    /// Any of the above, annotated with the document that failed.
    #[error("Failed to load '{path}': {source}")]
    Asset {
        path: String,
        #[source]
        source: Box<LoadError>,
    },
}

impl LoadError {
    pub(crate) fn malformed_accessor(accessor: usize, reason: impl Into<String>) -> Self {
        LoadError::MalformedAccessor {
            accessor,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_enum(field: &'static str, value: impl ToString) -> Self {
        LoadError::InvalidEnumValue {
            field,
            value: value.to_string(),
        }
    }

    pub(crate) fn with_path(self, path: &str) -> Self {
        match self {
            LoadError::Asset { .. } => self,
            other => LoadError::Asset {
                path: path.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any path context stripped.
    pub fn root(&self) -> &LoadError {
        match self {
            LoadError::Asset { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;
