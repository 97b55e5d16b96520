//! Conversion settings.

use std::path::PathBuf;

/// Default title of reports built from OFX statements.
pub const STATEMENT_REPORT_TITLE: &str = "Extrato OFX";

/// Default title of reports built from CSV tables.
pub const TABLE_REPORT_TITLE: &str = "Relatório CSV";

/// Settings for the document writers and the page renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterConfig {
    /// Title printed above OFX → PDF reports.
    pub statement_report_title: String,
    /// Title printed above CSV → PDF reports.
    pub table_report_title: String,
    /// Resolution used to rasterise PDF pages. 72 keeps one pixel per point.
    pub render_dpi: f32,
    /// JPEG quality (1-100) of rendered pages.
    pub jpeg_quality: u8,
    /// Resolution assumed for images wrapped into a PDF page.
    pub image_dpi: f32,
    /// Directory holding the pdfium shared library. The system library
    /// search path is used when unset or when loading from it fails.
    pub pdfium_library_dir: Option<PathBuf>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            statement_report_title: STATEMENT_REPORT_TITLE.to_string(),
            table_report_title: TABLE_REPORT_TITLE.to_string(),
            render_dpi: 72.0,
            jpeg_quality: 90,
            image_dpi: 100.0,
            pdfium_library_dir: None,
        }
    }
}

impl ConverterConfig {
    pub fn with_report_title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.statement_report_title = title.clone();
        self.table_report_title = title;
        self
    }

    pub fn with_render_dpi(mut self, dpi: f32) -> Self {
        self.render_dpi = dpi;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn with_pdfium_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pdfium_library_dir = Some(dir.into());
        self
    }
}
