//! SQL identifier and literal handling.
//!
//! Values are always bound as parameters; identifiers and DDL default literals
//! cannot be, so they go through these helpers before being embedded.

/// PostgreSQL truncates identifiers beyond NAMEDATALEN - 1 bytes.
pub const MAX_IDENT_LEN: usize = 63;

/// Accepts `[A-Za-z_][A-Za-z0-9_]*` up to [`MAX_IDENT_LEN`] bytes.
pub fn validate_ident(ident: &str) -> bool {
    if ident.len() > MAX_IDENT_LEN {
        return false;
    }
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Double-quotes an identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Single-quotes a string literal, doubling embedded quotes.
/// Assumes `standard_conforming_strings = on` (the server default).
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
