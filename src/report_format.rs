//! PDF report writer.
//!
//! Lays records out as a titled grid table on US Letter pages. The header
//! row is repeated on every page.

use crate::error::{Error, Result};
use crate::types::{format_two_decimals, TransactionRecord};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rect, Rgb,
};

const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN: f32 = 18.0;

const TITLE_SIZE: f32 = 18.0;
const HEADER_SIZE: f32 = 10.0;
const BODY_SIZE: f32 = 9.0;
const ROW_HEIGHT: f32 = 8.0;
const CELL_PADDING: f32 = 2.0;

/// Millimetres per typographic point.
const MM_PER_PT: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

const HEADERS: [&str; 4] = ["Data", "Descrição", "Valor", "ID"];
// Sums to the printable width, PAGE_WIDTH - 2 * MARGIN.
const COLUMN_WIDTHS: [f32; 4] = [26.0, 95.0, 28.0, 30.9];

fn header_fill() -> Color {
    Color::Rgb(Rgb::new(0.5, 0.5, 0.5, None))
}

fn body_fill() -> Color {
    Color::Rgb(Rgb::new(0.96, 0.96, 0.86, None))
}

fn white() -> Color {
    Color::Rgb(Rgb::new(0.96, 0.96, 0.96, None))
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Render records as a PDF report headed by `title`.
pub fn write_report(records: &[TransactionRecord], title: &str) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| Error::Report(e.to_string()))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| Error::Report(e.to_string()))?,
    };

    let mut current = doc.get_page(page).get_layer(layer);
    current.set_fill_color(black());
    current.use_text(title, TITLE_SIZE, Mm(MARGIN), Mm(PAGE_HEIGHT - MARGIN - 7.0), &fonts.bold);

    let mut top = PAGE_HEIGHT - MARGIN - 14.0;
    draw_row(&current, &fonts, top, &HEADERS.map(String::from), true);
    top -= ROW_HEIGHT;

    for record in records {
        if top - ROW_HEIGHT < MARGIN {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            current = doc.get_page(page).get_layer(layer);
            top = PAGE_HEIGHT - MARGIN;
            draw_row(&current, &fonts, top, &HEADERS.map(String::from), true);
            top -= ROW_HEIGHT;
        }
        draw_row(&current, &fonts, top, &cells(record), false);
        top -= ROW_HEIGHT;
    }

    doc.save_to_bytes().map_err(|e| Error::Report(e.to_string()))
}

fn cells(record: &TransactionRecord) -> [String; 4] {
    [
        record.date.format("%d/%m/%Y").to_string(),
        record.description.clone(),
        format_two_decimals(record.amount),
        record.id.clone(),
    ]
}

/// Draw one table row whose top edge is at `top` (mm from the page bottom).
fn draw_row(layer: &PdfLayerReference, fonts: &Fonts, top: f32, values: &[String; 4], header: bool) {
    let bottom = top - ROW_HEIGHT;
    let right = PAGE_WIDTH - MARGIN;

    layer.set_fill_color(if header { header_fill() } else { body_fill() });
    layer.add_rect(Rect::new(Mm(MARGIN), Mm(bottom), Mm(right), Mm(top)));

    layer.set_outline_color(black());
    layer.set_outline_thickness(0.5);
    for y in [top, bottom] {
        layer.add_line(segment((MARGIN, y), (right, y)));
    }

    let (font, size) = if header {
        (&fonts.bold, HEADER_SIZE)
    } else {
        (&fonts.regular, BODY_SIZE)
    };
    layer.set_fill_color(if header { white() } else { black() });

    let mut left = MARGIN;
    for (value, width) in values.iter().zip(COLUMN_WIDTHS) {
        layer.add_line(segment((left, bottom), (left, top)));
        let text = truncate(value, width - 2.0 * CELL_PADDING, size);
        layer.use_text(text, size, Mm(left + CELL_PADDING), Mm(bottom + 2.6), font);
        left += width;
    }
    layer.add_line(segment((right, bottom), (right, top)));
}

fn segment(from: (f32, f32), to: (f32, f32)) -> Line {
    Line {
        points: vec![
            (Point::new(Mm(from.0), Mm(from.1)), false),
            (Point::new(Mm(to.0), Mm(to.1)), false),
        ],
        is_closed: false,
    }
}

/// Shorten `text` to roughly fit `width` millimetres at `size` points.
fn truncate(text: &str, width: f32, size: f32) -> String {
    let max_chars = (width / (size * AVG_GLYPH_WIDTH * MM_PER_PT)).floor() as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}
