//! Text operators

use log::warn;

/// Generate PDF operators showing text at the current origin
///
/// # Arguments
/// * `font_name` - Font resource name (e.g., "F1")
/// * `font_size` - Font size in points
/// * `shown` - Encoded string operand, `<hex>` or `(literal)`
pub fn generate_text_operators(font_name: &str, font_size: f32, shown: &str) -> String {
    format!("BT\n/{font_name} {font_size} Tf\n0 0 Td\n{shown} Tj\nET\n")
}

/// Encode text as a literal string for a WinAnsi-encoded simple font
///
/// Characters outside Latin-1 have no code in the font and are replaced
/// with `?`. Bytes outside printable ASCII are written as octal escapes.
pub fn encode_literal(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + 2);
    let mut replaced = 0;

    result.push('(');
    for c in text.chars() {
        let code = match u8::try_from(c as u32) {
            Ok(code) => code,
            Err(_) => {
                replaced += 1;
                b'?'
            }
        };
        match code {
            b'(' | b')' | b'\\' => {
                result.push('\\');
                result.push(code as char);
            }
            0x20..=0x7E => result.push(code as char),
            _ => result.push_str(&format!("\\{code:03o}")),
        }
    }
    result.push(')');

    if replaced > 0 {
        warn!(
            "{} character(s) cannot be shown with the built-in font and were replaced",
            replaced
        );
    }

    result
}
