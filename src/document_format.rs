//! Bridge between PDF documents and raster images.
//!
//! PDF pages are rasterised with pdfium and encoded as JPEG; single images
//! are wrapped into a one-page PDF with printpdf.

use crate::config::ConverterConfig;
use crate::error::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage};
use pdfium_render::prelude::{PdfRenderConfig, Pdfium};
use printpdf::{ImageTransform, Mm, PdfDocument};
use std::fs;
use std::path::Path;

const MM_PER_INCH: f32 = 25.4;
const POINTS_PER_INCH: f32 = 72.0;

/// Render every page of the PDF at `path` as a JPEG, in page order.
pub fn document_to_images<P: AsRef<Path>>(path: P, config: &ConverterConfig) -> Result<Vec<Vec<u8>>> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    render_pages(&bytes, &display_name(path), config)
}

/// Render every page of an in-memory PDF as a JPEG.
///
/// `name` identifies the document in error messages.
pub fn render_pages(bytes: &[u8], name: &str, config: &ConverterConfig) -> Result<Vec<Vec<u8>>> {
    let pdfium = bind_pdfium(config)?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| Error::ParseError(format!("'{}' could not be opened as a PDF: {}", name, e)))?;

    let mut pages = Vec::new();
    for (index, page) in document.pages().iter().enumerate() {
        let width = (page.width().value / POINTS_PER_INCH * config.render_dpi).round().max(1.0) as i32;
        let bitmap = page.render_with_config(&PdfRenderConfig::new().set_target_width(width))?;

        let rgba = RgbaImage::from_raw(bitmap.width() as u32, bitmap.height() as u32, bitmap.as_rgba_bytes())
            .ok_or_else(|| Error::Renderer(format!("page {} produced a malformed bitmap", index + 1)))?;
        let rgb = flatten_alpha(DynamicImage::ImageRgba8(rgba));

        pages.push(encode_jpeg(&rgb, config.jpeg_quality)?);
        tracing::debug!(page = index + 1, "rendered page");
    }

    if pages.is_empty() {
        return Err(Error::EmptyDocument(name.to_string()));
    }

    Ok(pages)
}

/// Wrap the image at `path` into a single-page PDF.
pub fn image_to_document<P: AsRef<Path>>(path: P, config: &ConverterConfig) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    image_bytes_to_document(&bytes, &display_name(path), config)
}

/// Wrap an in-memory image into a single-page PDF sized to the image.
pub fn image_bytes_to_document(bytes: &[u8], name: &str, config: &ConverterConfig) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes).map_err(|e| {
        tracing::debug!(error = %e, "image decoding failed");
        Error::InvalidImage { file: name.to_string() }
    })?;

    let (width, height) = decoded.dimensions();
    let flattened = DynamicImage::ImageRgb8(flatten_alpha(decoded));

    let dpi = config.image_dpi;
    let (doc, page, layer) = PdfDocument::new(
        name,
        Mm(width as f32 / dpi * MM_PER_INCH),
        Mm(height as f32 / dpi * MM_PER_INCH),
        "Layer 1",
    );

    printpdf::Image::from_dynamic_image(&flattened).add_to_layer(
        doc.get_page(page).get_layer(layer),
        ImageTransform {
            dpi: Some(dpi),
            ..Default::default()
        },
    );

    doc.save_to_bytes().map_err(|e| Error::Report(e.to_string()))
}

fn bind_pdfium(config: &ConverterConfig) -> Result<Pdfium> {
    let bindings = match &config.pdfium_library_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
            &dir.display().to_string(),
        ))
        .or_else(|_| Pdfium::bind_to_system_library()),
        None => Pdfium::bind_to_system_library(),
    }?;

    Ok(Pdfium::new(bindings))
}

/// Convert to 8-bit RGB, compositing any transparency onto white.
fn flatten_alpha(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let blend = |c: u8| ((c as u32 * a as u32 + 255 * (255 - a as u32)) / 255) as u8;
        rgb.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }
    rgb
}

fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(image)
        .map_err(|e| Error::Renderer(format!("JPEG encoding failed: {}", e)))?;
    Ok(buf)
}

/// File name shown to the user, without directories.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png).unwrap();
        buf
    }

    #[test]
    fn test_flatten_alpha_onto_white() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([10, 20, 30, 255]));

        let rgb = flatten_alpha(DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_image_to_document() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 20, Rgba([200, 10, 10, 128])));
        let pdf = image_bytes_to_document(&png_bytes(image), "scan.png", &ConverterConfig::default()).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_non_image_is_rejected_by_name() {
        let err = image_bytes_to_document(b"just some text", "notes.jpg", &ConverterConfig::default())
            .unwrap_err();
        match err {
            Error::InvalidImage { file } => assert_eq!(file, "notes.jpg"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_encode_jpeg_is_decodable() {
        let jpeg = encode_jpeg(&RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3])), 90).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (8, 8));
    }

    #[test]
    fn test_display_name_drops_directories() {
        assert_eq!(display_name(Path::new("/tmp/in/scan.jpg")), "scan.jpg");
    }
}
