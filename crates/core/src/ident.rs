//! SQL identifier helpers.
//!
//! Table, column and keyword names are compared case-insensitively after
//! trimming, with Unicode case folding. Quoting is not preserved: `"Salario"` and `salario` name
//! the same column, so a deny rule can never be dodged by changing case.

/// Canonical form of an identifier: trimmed, surrounding double quotes
/// removed, lowercased.
pub fn normalize(ident: &str) -> String {
    let trimmed = ident.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.to_lowercase()
}

/// Case-insensitive identifier equality.
pub fn eq(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// The unqualified part of a `schema.table` name.
pub fn unqualified(table: &str) -> &str {
    table.rsplit_once('.').map_or(table, |(_, tail)| tail)
}

/// Does `reference` name `table`, either fully (`public.ventas`) or by its
/// unqualified tail (`ventas`)?
pub fn names_table(reference: &str, table: &str) -> bool {
    eq(reference, table) || (!reference.contains('.') && eq(reference, unqualified(table)))
}

/// Characters that make up a SQL word token.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
