//! Error types for the conversor library.

use crate::Format;
use std::io;
use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading, writing, or converting files.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred during read or write operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error tokenizing CSV input or writing CSV output.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error producing XML output.
    #[error("XML error: {0}")]
    XmlError(String),

    /// The requested pair of formats has no conversion.
    #[error("conversion from {} to {} is not supported", .from.label(), .to.label())]
    UnsupportedConversion { from: Format, to: Format },

    /// A source file that could not be structurally parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A statement that failed with its declared encoding and again after
    /// re-decoding as a single-byte encoding.
    #[error("could not parse statement: {strict} (declared encoding); {fallback} (fallback decoding)")]
    StatementParse { strict: String, fallback: String },

    /// Required columns are absent from a table.
    #[error("missing required column(s): {}", .missing.join(", "))]
    SchemaError { missing: Vec<String> },

    /// A value that is present but cannot be coerced.
    #[error("invalid {column} value '{value}' on line {line}: {reason}")]
    ValidationError {
        line: u64,
        column: String,
        value: String,
        reason: String,
    },

    /// A writer that needs at least one record received none.
    #[error("no transactions to write")]
    EmptyInput,

    /// A document that produced no pages.
    #[error("no pages could be extracted from '{0}'")]
    EmptyDocument(String),

    /// A file that cannot be decoded as an image.
    #[error("'{file}' is not a valid image file (JPG, PNG, etc.)")]
    InvalidImage { file: String },

    /// PDF output could not be assembled.
    #[error("PDF error: {0}")]
    Report(String),

    /// The PDF rendering engine is unavailable or failed.
    #[error("renderer error: {0}")]
    Renderer(String),

    /// Invalid date format.
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid amount format.
    #[error("Invalid amount format: {0}")]
    InvalidAmount(String),

    /// Missing required field.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Invalid format specified.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl From<pdfium_render::prelude::PdfiumError> for Error {
    fn from(err: pdfium_render::prelude::PdfiumError) -> Self {
        Error::Renderer(err.to_string())
    }
}
