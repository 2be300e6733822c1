//! PDF text string encoding
//!
//! Field names (`/T`) and text values (`/V`) are PDF text strings: either
//! UTF-16BE prefixed with a byte order mark, UTF-8 prefixed with a BOM
//! (PDF 2.0), or single-byte PDFDocEncoding.

use lopdf::{Object, StringFormat};

const UTF16BE_BOM: [u8; 2] = [0xFE, 0xFF];
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Decode the raw bytes of a PDF text string
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&UTF16BE_BOM) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    if let Some(rest) = bytes.strip_prefix(&UTF8_BOM) {
        return String::from_utf8_lossy(rest).into_owned();
    }

    bytes.iter().map(|&b| pdfdoc_decode(b)).collect()
}

/// PDFDocEncoding code points 0x80-0x9F (ISO 32000-1, Annex D.2)
const PDFDOC_HIGH: [char; 32] = [
    '\u{2022}', // BULLET
    '\u{2020}', // DAGGER
    '\u{2021}', // DOUBLE DAGGER
    '\u{2026}', // HORIZONTAL ELLIPSIS
    '\u{2014}', // EM DASH
    '\u{2013}', // EN DASH
    '\u{0192}', // LATIN SMALL LETTER F WITH HOOK
    '\u{2044}', // FRACTION SLASH
    '\u{2039}', // SINGLE LEFT-POINTING ANGLE QUOTATION MARK
    '\u{203A}', // SINGLE RIGHT-POINTING ANGLE QUOTATION MARK
    '\u{2212}', // MINUS SIGN
    '\u{2030}', // PER MILLE SIGN
    '\u{201E}', // DOUBLE LOW-9 QUOTATION MARK
    '\u{201C}', // LEFT DOUBLE QUOTATION MARK
    '\u{201D}', // RIGHT DOUBLE QUOTATION MARK
    '\u{2018}', // LEFT SINGLE QUOTATION MARK
    '\u{2019}', // RIGHT SINGLE QUOTATION MARK
    '\u{201A}', // SINGLE LOW-9 QUOTATION MARK
    '\u{2122}', // TRADE MARK SIGN
    '\u{FB01}', // LATIN SMALL LIGATURE FI
    '\u{FB02}', // LATIN SMALL LIGATURE FL
    '\u{0141}', // LATIN CAPITAL LETTER L WITH STROKE
    '\u{0152}', // LATIN CAPITAL LIGATURE OE
    '\u{0160}', // LATIN CAPITAL LETTER S WITH CARON
    '\u{0178}', // LATIN CAPITAL LETTER Y WITH DIAERESIS
    '\u{017D}', // LATIN CAPITAL LETTER Z WITH CARON
    '\u{0131}', // LATIN SMALL LETTER DOTLESS I
    '\u{0142}', // LATIN SMALL LETTER L WITH STROKE
    '\u{0153}', // LATIN SMALL LIGATURE OE
    '\u{0161}', // LATIN SMALL LETTER S WITH CARON
    '\u{017E}', // LATIN SMALL LETTER Z WITH CARON
    '\u{FFFD}', // undefined
];

/// Decode one PDFDocEncoding byte
///
/// ASCII and Latin-1 apart from the diacritic block at 0x18-0x1F, the
/// 0x80-0x9F table and the euro sign at 0xA0.
fn pdfdoc_decode(code: u8) -> char {
    match code {
        0x18 => '\u{02D8}', // BREVE
        0x19 => '\u{02C7}', // CARON
        0x1A => '\u{02C6}', // MODIFIER LETTER CIRCUMFLEX ACCENT
        0x1B => '\u{02D9}', // DOT ABOVE
        0x1C => '\u{02DD}', // DOUBLE ACUTE ACCENT
        0x1D => '\u{02DB}', // OGONEK
        0x1E => '\u{02DA}', // RING ABOVE
        0x1F => '\u{02DC}', // SMALL TILDE
        0x80..=0x9F => PDFDOC_HIGH[(code - 0x80) as usize],
        0xA0 => '\u{20AC}', // EURO SIGN
        _ => code as char,
    }
}

/// Encode a string as a PDF text string object
///
/// ASCII text is written as a literal string; anything else as UTF-16BE
/// with a byte order mark.
pub fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = UTF16BE_BOM.to_vec();
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Read a text-like object (string or name) as a Rust string
pub(crate) fn object_text(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}
