//! Error types shared by every fallible operation in the crate.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds surfaced by the DICOM and codec layers.
///
/// Callers may match on the variant; message text is informational only.
#[derive(Error, Debug)]
pub enum Error {
    /// Error while parsing a DICOM file or element.
    #[error("DICOM parse error: {0}")]
    DicomParse(String),

    /// Transfer syntax is not handled by this crate.
    #[error("unsupported transfer syntax: {0}")]
    UnsupportedTransferSyntax(String),

    /// Error raised by a codec during encode or decode.
    #[error("codec failure: {0}")]
    CodecFailure(String),

    /// Input bytes are not in a recognized format.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Image dimensions or pixel buffer are inconsistent.
    #[error("image data error: {0}")]
    ImageData(String),

    /// Invalid compression configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A validation rule was violated (e.g. modality policy).
    #[error("validation error: {0}")]
    Validation(String),

    /// A compression constraint (e.g. target ratio) cannot be met.
    #[error("compression constraint violation: {0}")]
    CompressionConstraint(String),

    /// Failure in the compression pipeline itself.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// I/O error at the orchestrator boundary.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
