//! Error types for mesh export and import.

use thiserror::Error;

/// Errors that can occur during mesh file operations.
#[derive(Error, Debug)]
pub enum MesherError {
    /// File extension is not `.3mf` or `.stl`.
    #[error("unknown file format {0:?} - must be 3mf or stl")]
    UnsupportedExtension(String),

    /// I/O error reading or writing a file. Propagated unchanged; a
    /// missing file on read surfaces here.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A generated mesh object failed validation. This indicates a
    /// corrupt geometry pipeline, not a data-quality issue, and aborts
    /// the export call.
    #[error("mesh is invalid: {0}")]
    InvalidMesh(String),

    /// An imported mesh references vertices that do not exist.
    #[error("malformed mesh: {0}")]
    MalformedMesh(String),

    /// A container file could not be decoded.
    #[error("invalid container: {0}")]
    InvalidContainer(String),
}

impl MesherError {
    /// Container decoding error from any displayable cause.
    pub(crate) fn container(message: impl Into<String>) -> Self {
        Self::InvalidContainer(message.into())
    }
}

/// Result type for mesher operations.
pub type Result<T> = std::result::Result<T, MesherError>;
