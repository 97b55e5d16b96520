//! Conversor Library
//!
//! A library for converting personal finance files between formats.
//!
//! # Supported Formats
//!
//! - **OFX**: bank statement exports (SGML 1.x, XML 2.x headers)
//! - **CSV**: semicolon-delimited tables with comma decimals
//! - **PDF**: tabular reports, and documents rasterised to images
//! - **JPG**: one image per rendered page, or a single image wrapped in a PDF
//! - **XML**: a flat export of statement transactions
//!
//! # Supported Conversions
//!
//! | From | To  |
//! |------|-----|
//! | OFX  | CSV, PDF, XML |
//! | CSV  | OFX, PDF |
//! | PDF  | JPG |
//! | JPG  | PDF |
//!
//! Every other pair fails with [`Error::UnsupportedConversion`].
//!
//! # Examples
//!
//! ## Converting an OFX statement to CSV
//!
//! ```no_run
//! use conversor::{convert, ConversionOutput, Format};
//!
//! let output = convert("extrato.ofx", Format::Ofx, Format::Csv)?;
//! if let ConversionOutput::Text(csv) = &output {
//!     println!("{}", csv);
//! }
//! output.save("extrato.csv")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Reading records directly
//!
//! ```no_run
//! use std::fs::File;
//! use conversor::ofx_format::OfxStatement;
//!
//! let mut file = File::open("extrato.ofx")?;
//! let statement = OfxStatement::from_read(&mut file)?;
//! println!("{} transactions", statement.records.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod conversion;
pub mod csv_format;
pub mod document_format;
pub mod encoding;
pub mod error;
pub mod ofx_format;
pub mod output;
pub mod report_format;
pub mod types;
pub mod update;
pub mod xml_format;

use std::path::Path;
use std::str::FromStr;

// Re-export commonly used types
pub use config::ConverterConfig;
pub use conversion::{convert, convert_with, ConversionRequest};
pub use error::{Error, Result};
pub use output::ConversionOutput;
pub use types::{RecordSet, TransactionRecord};

/// File formats known to the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// OFX bank statement
    Ofx,
    /// Semicolon-delimited table
    Csv,
    /// Portable document
    Pdf,
    /// JPEG image
    Jpg,
    /// Flat XML export
    Xml,
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "ofx" => Ok(Format::Ofx),
            "csv" => Ok(Format::Csv),
            "pdf" => Ok(Format::Pdf),
            "jpg" | "jpeg" => Ok(Format::Jpg),
            "xml" => Ok(Format::Xml),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

impl Format {
    /// All formats, in the order they are offered to the user.
    pub const ALL: [Format; 5] = [Format::Ofx, Format::Csv, Format::Pdf, Format::Jpg, Format::Xml];

    /// Get the canonical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Ofx => "ofx",
            Format::Csv => "csv",
            Format::Pdf => "pdf",
            Format::Jpg => "jpg",
            Format::Xml => "xml",
        }
    }

    /// Extensions accepted when picking a source file of this format.
    pub fn accepted_extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Jpg => &["jpg", "jpeg"],
            Format::Ofx => &["ofx"],
            Format::Csv => &["csv"],
            Format::Pdf => &["pdf"],
            Format::Xml => &["xml"],
        }
    }

    /// Human-readable description used for file filters.
    pub fn description(&self) -> &'static str {
        match self {
            Format::Ofx => "OFX statement",
            Format::Csv => "CSV file",
            Format::Pdf => "PDF file",
            Format::Jpg => "JPG image",
            Format::Xml => "XML file",
        }
    }

    /// Upper-case name shown in messages.
    pub fn label(&self) -> &'static str {
        match self {
            Format::Ofx => "OFX",
            Format::Csv => "CSV",
            Format::Pdf => "PDF",
            Format::Jpg => "JPG",
            Format::Xml => "XML",
        }
    }

    /// Whether the path's extension is one this format accepts.
    pub fn matches_path<P: AsRef<Path>>(&self, path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.accepted_extensions().iter().any(|accepted| *accepted == ext)
            })
            .unwrap_or(false)
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("ofx".parse::<Format>().unwrap(), Format::Ofx);
        assert_eq!("OFX".parse::<Format>().unwrap(), Format::Ofx);
        assert_eq!("jpeg".parse::<Format>().unwrap(), Format::Jpg);
        assert_eq!(".csv".parse::<Format>().unwrap(), Format::Csv);
        assert!("mt940".parse::<Format>().is_err());
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(Format::Ofx.extension(), "ofx");
        assert_eq!(Format::Jpg.extension(), "jpg");
        assert_eq!(Format::Xml.extension(), "xml");
    }

    #[test]
    fn test_matches_path() {
        assert!(Format::Jpg.matches_path("scan.JPEG"));
        assert!(Format::Ofx.matches_path("/tmp/extrato.ofx"));
        assert!(!Format::Csv.matches_path("extrato.ofx"));
        assert!(!Format::Pdf.matches_path("no_extension"));
    }
}
