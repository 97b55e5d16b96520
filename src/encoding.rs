//! Text decoding with a single-byte fallback.
//!
//! Bank exports often declare one encoding and contain another (typically
//! Windows-1252 accents under a 7-bit ASCII declaration). Readers first
//! decode strictly and, when that fails, re-decode the same bytes with
//! [`decode_single_byte`].

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::borrow::Cow;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encoding a file claims to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declared {
    /// 7-bit US-ASCII.
    Ascii,
    /// Any encoding known by its WHATWG label.
    Label(&'static Encoding),
}

impl Declared {
    /// Resolve an encoding name as found in a file header.
    ///
    /// Unknown names resolve to `None` and callers treat them as UTF-8.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        match name.to_ascii_uppercase().replace(['-', '_'], "").as_str() {
            "USASCII" | "ASCII" => Some(Declared::Ascii),
            _ => Encoding::for_label(name.as_bytes()).map(Declared::Label),
        }
    }

    /// Name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Declared::Ascii => "US-ASCII",
            Declared::Label(encoding) => encoding.name(),
        }
    }
}

impl Default for Declared {
    fn default() -> Self {
        Declared::Label(UTF_8)
    }
}

/// Decode `bytes` as `declared`, failing on the first byte that does not map.
pub fn decode_strict(bytes: &[u8], declared: Declared) -> Result<String, String> {
    match declared {
        Declared::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
            None => Ok(String::from_utf8_lossy(bytes).into_owned()),
            Some(offset) => Err(format!(
                "byte 0x{:02X} at offset {} is not valid US-ASCII",
                bytes[offset], offset
            )),
        },
        Declared::Label(encoding) => {
            let bytes = if encoding == UTF_8 {
                bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
            } else {
                bytes
            };
            encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(Cow::into_owned)
                .ok_or_else(|| format!("input is not valid {}", encoding.name()))
        }
    }
}

/// Decode `bytes` as Windows-1252, replacing anything that cannot be mapped.
pub fn decode_single_byte(bytes: &[u8]) -> String {
    let (text, had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
    if had_errors {
        tracing::debug!("replaced unmappable bytes while decoding as windows-1252");
    }
    text.into_owned()
}

/// Decode as UTF-8, falling back to Windows-1252.
///
/// Returns the text and whether the fallback was used.
pub fn decode_utf8_or_single_byte(bytes: &[u8]) -> (String, bool) {
    match decode_strict(bytes, Declared::default()) {
        Ok(text) => (text, false),
        Err(reason) => {
            tracing::debug!(%reason, "falling back to windows-1252");
            (decode_single_byte(bytes), true)
        }
    }
}
