//! Error types for the verichain-primitives crate
//!
//! Every fallible operation in this crate returns [`PrimitivesError`]. Callers
//! higher up the stack (the client crate in particular) fold these variants
//! into their own error type with `#[from]`.

use thiserror::Error;

/// Result type for operations in the primitives crate
pub type Result<T> = std::result::Result<T, PrimitivesError>;

/// Main error type for the primitives crate
#[derive(Error, Debug)]
pub enum PrimitivesError {
    /// A hand-entered document hash is not 64 hexadecimal characters
    #[error("invalid hash format: {0}")]
    InvalidHashFormat(String),

    /// A file's declared media type is not on the document allow-list
    #[error("unsupported file type `{media_type}` for `{name}`: expected a PDF, DOC, DOCX or TXT file")]
    UnsupportedFileType {
        /// File name as reported by the platform.
        name: String,
        /// Declared media type (may be empty).
        media_type: String,
    },

    /// Input/output errors while reading document contents
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
