//! Conversion results and how they are saved.

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Number of text lines shown by [`ConversionOutput::preview`].
const PREVIEW_LINES: usize = 15;

/// Result of a conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionOutput {
    /// Textual formats (OFX, CSV, XML).
    Text(String),
    /// A single binary document (PDF).
    Bytes(Vec<u8>),
    /// One encoded image per rendered page (JPG).
    ImagePages(Vec<Vec<u8>>),
}

impl ConversionOutput {
    /// Save the output and return every file written.
    ///
    /// Text and bytes go to `destination`. Image pages are written next to
    /// it as `{stem}_pagina_{n}.jpg`, numbered from 1.
    pub fn save<P: AsRef<Path>>(&self, destination: P) -> Result<Vec<PathBuf>> {
        let destination = destination.as_ref();
        match self {
            ConversionOutput::Text(text) => {
                fs::write(destination, text.as_bytes())?;
                Ok(vec![destination.to_path_buf()])
            }
            ConversionOutput::Bytes(bytes) => {
                fs::write(destination, bytes)?;
                Ok(vec![destination.to_path_buf()])
            }
            ConversionOutput::ImagePages(pages) => {
                let mut written = Vec::with_capacity(pages.len());
                for (index, page) in pages.iter().enumerate() {
                    let page_path = page_path(destination, index + 1);
                    fs::write(&page_path, page)?;
                    written.push(page_path);
                }
                Ok(written)
            }
        }
    }

    /// Short human-readable preview of the output.
    pub fn preview(&self) -> String {
        match self {
            ConversionOutput::Text(text) => {
                let mut lines: Vec<&str> = text.lines().take(PREVIEW_LINES + 1).collect();
                if lines.len() > PREVIEW_LINES {
                    lines.truncate(PREVIEW_LINES);
                    lines.push("...");
                }
                lines.join("\n")
            }
            ConversionOutput::Bytes(bytes) => format!("[binary document, {} bytes]", bytes.len()),
            ConversionOutput::ImagePages(pages) => format!("[{} page image(s)]", pages.len()),
        }
    }
}

/// Path of the `number`-th page image saved for `destination`.
pub fn page_path(destination: &Path, number: usize) -> PathBuf {
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pagina".to_string());
    let name = format!("{}_pagina_{}.jpg", stem, number);
    match destination.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}
