//! Windows-1252 encoding utilities for Latin thermal printers
//!
//! Kitchen printers are switched to code page WPC1252 (`ESC t 16`) so that
//! accented Spanish text (ñ, á, é, ¿) prints correctly. Column math is done
//! in characters: every glyph of the code page occupies one cell.

/// Placeholder byte for characters outside Windows-1252
const UNMAPPABLE: u8 = b'?';

/// Get the printed width of a string in character cells
pub fn text_width(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string to fit within a character width
fn truncate_width(s: &str, max_width: usize) -> String {
    s.chars().take(max_width).collect()
}

/// Center a string inside a character width, extra space going right
pub fn center_width(s: &str, width: usize) -> String {
    let current = text_width(s);
    if current >= width {
        return truncate_width(s, width);
    }
    let left = (width - current) / 2;
    let right = width - current - left;
    format!("{}{}{}", " ".repeat(left), s, " ".repeat(right))
}

/// Encode UTF-8 text as Windows-1252
///
/// Characters without a Windows-1252 mapping become `?` instead of the
/// HTML numeric references `encoding_rs` would emit.
pub fn encode_cp1252(s: &str) -> Vec<u8> {
    if s.is_ascii() {
        return s.as_bytes().to_vec();
    }

    let mut out = Vec::with_capacity(s.len());
    let mut utf8 = [0u8; 4];
    for c in s.chars() {
        if c.is_ascii() {
            out.push(c as u8);
            continue;
        }
        let (bytes, _, had_errors) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut utf8));
        if had_errors {
            out.push(UNMAPPABLE);
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}
