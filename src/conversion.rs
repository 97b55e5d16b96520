//! Format conversion dispatch.
//!
//! Every supported `(source, target)` pair is bound to a reader → writer
//! pipeline in [`pipeline`]. Pairs without an entry fail with
//! [`Error::UnsupportedConversion`] before the source file is opened.

use crate::config::ConverterConfig;
use crate::csv_format::CsvTable;
use crate::document_format;
use crate::error::{Error, Result};
use crate::ofx_format::OfxStatement;
use crate::output::ConversionOutput;
use crate::report_format;
use crate::types::RecordSet;
use crate::xml_format;
use crate::Format;
use std::fs;
use std::path::{Path, PathBuf};

/// A reader → writer pipeline bound to one pair of formats.
pub type Pipeline = fn(&Path, &ConverterConfig) -> Result<ConversionOutput>;

/// Pairs with a pipeline, in display order.
pub const SUPPORTED_CONVERSIONS: [(Format, Format); 7] = [
    (Format::Ofx, Format::Csv),
    (Format::Csv, Format::Ofx),
    (Format::Ofx, Format::Pdf),
    (Format::Ofx, Format::Xml),
    (Format::Csv, Format::Pdf),
    (Format::Pdf, Format::Jpg),
    (Format::Jpg, Format::Pdf),
];

/// A single conversion to perform.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub source_path: PathBuf,
    pub source_format: Format,
    pub target_format: Format,
}

impl ConversionRequest {
    pub fn new(source_path: impl Into<PathBuf>, source_format: Format, target_format: Format) -> Self {
        Self {
            source_path: source_path.into(),
            source_format,
            target_format,
        }
    }
}

/// Look up the pipeline for a pair of formats.
///
/// XML sources and CSV → XML have no pipeline: neither side has an agreed
/// transaction schema for XML input or table export.
pub fn pipeline(from: Format, to: Format) -> Option<Pipeline> {
    use Format::*;

    match (from, to) {
        (Ofx, Csv) => Some(ofx_to_csv),
        (Csv, Ofx) => Some(csv_to_ofx),
        (Ofx, Pdf) => Some(ofx_to_pdf),
        (Ofx, Xml) => Some(ofx_to_xml),
        (Csv, Pdf) => Some(csv_to_pdf),
        (Pdf, Jpg) => Some(pdf_to_jpg),
        (Jpg, Pdf) => Some(jpg_to_pdf),
        (Xml, _) | (Csv, Xml) => None,
        (Ofx | Csv | Pdf | Jpg, _) => None,
    }
}

/// Whether a pair of formats can be converted.
pub fn is_supported(from: Format, to: Format) -> bool {
    pipeline(from, to).is_some()
}

/// Convert the file at `path` with the default configuration.
pub fn convert<P: AsRef<Path>>(path: P, from: Format, to: Format) -> Result<ConversionOutput> {
    convert_with(
        &ConversionRequest::new(path.as_ref(), from, to),
        &ConverterConfig::default(),
    )
}

/// Run a conversion request.
pub fn convert_with(request: &ConversionRequest, config: &ConverterConfig) -> Result<ConversionOutput> {
    let run = pipeline(request.source_format, request.target_format).ok_or(Error::UnsupportedConversion {
        from: request.source_format,
        to: request.target_format,
    })?;

    tracing::info!(
        "converting {} from {} to {}",
        request.source_path.display(),
        request.source_format,
        request.target_format
    );
    run(&request.source_path, config)
}

/// Read the OFX statement at `path`.
pub fn read_statement<P: AsRef<Path>>(path: P) -> Result<RecordSet> {
    let bytes = fs::read(path)?;
    Ok(OfxStatement::from_bytes(&bytes)?.records)
}

/// Read the CSV table at `path`.
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<RecordSet> {
    let bytes = fs::read(path)?;
    Ok(CsvTable::from_bytes(&bytes)?.records)
}

fn ofx_to_csv(path: &Path, _config: &ConverterConfig) -> Result<ConversionOutput> {
    let records = read_statement(path)?;
    Ok(ConversionOutput::Text(CsvTable { records }.to_csv_string()?))
}

fn csv_to_ofx(path: &Path, _config: &ConverterConfig) -> Result<ConversionOutput> {
    let records = read_table(path)?;
    Ok(ConversionOutput::Text(OfxStatement { records }.to_ofx_string()?))
}

fn ofx_to_pdf(path: &Path, config: &ConverterConfig) -> Result<ConversionOutput> {
    let records = read_statement(path)?;
    let bytes = report_format::write_report(&records, &config.statement_report_title)?;
    Ok(ConversionOutput::Bytes(bytes))
}

fn ofx_to_xml(path: &Path, _config: &ConverterConfig) -> Result<ConversionOutput> {
    let records = read_statement(path)?;
    Ok(ConversionOutput::Text(xml_format::to_xml_string(&records)?))
}

fn csv_to_pdf(path: &Path, config: &ConverterConfig) -> Result<ConversionOutput> {
    let records = read_table(path)?;
    let bytes = report_format::write_report(&records, &config.table_report_title)?;
    Ok(ConversionOutput::Bytes(bytes))
}

fn pdf_to_jpg(path: &Path, config: &ConverterConfig) -> Result<ConversionOutput> {
    let pages = document_format::document_to_images(path, config)?;
    Ok(ConversionOutput::ImagePages(pages))
}

fn jpg_to_pdf(path: &Path, config: &ConverterConfig) -> Result<ConversionOutput> {
    let bytes = document_format::image_to_document(path, config)?;
    Ok(ConversionOutput::Bytes(bytes))
}
