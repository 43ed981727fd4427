//! Forbidden-keyword matching for WHERE clauses.
//!
//! The WHERE text is split into word tokens: maximal runs of alphanumerics
//! (any script) and `_`, upper-cased. A configured keyword is matched in
//! one of three ways:
//!
//! ```text
//! DROP            single word   → whole-token match     ("x; drop" yes, "dropped_at" no)
//! UNION SELECT    several words → consecutive tokens    ("union   Select" yes)
//! ;  or  --       punctuation   → substring of the text ("a = 1; b" yes)
//! ```
//!
//! String literals are not exempt: `name = 'drop'` matches `DROP`.

use querygate_core::ident::is_word_char;
use std::collections::BTreeSet;

/// Upper-cased word tokens of `text`, in order.
pub fn word_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !is_word_char(c))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_uppercase())
        .collect()
}

/// The first keyword (in set order) found in `expression`, if any.
///
/// `keywords` must already be normalized (upper-case, single spaces), which
/// is how [`crate::SqlSelectPolicy`] stores them.
pub fn find_forbidden_keyword<'k>(
    expression: &str,
    keywords: &'k BTreeSet<String>,
) -> Option<&'k str> {
    let tokens = word_tokens(expression);
    let upper_text = collapse_whitespace(&expression.to_uppercase());

    keywords
        .iter()
        .find(|keyword| matches_keyword(keyword, &tokens, &upper_text))
        .map(String::as_str)
}

fn matches_keyword(keyword: &str, tokens: &[String], upper_text: &str) -> bool {
    let parts: Vec<&str> = keyword.split(' ').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return false;
    }
    let is_wordy = parts.iter().all(|p| p.chars().all(is_word_char));
    if !is_wordy {
        return upper_text.contains(keyword);
    }
    if parts.len() > tokens.len() {
        return false;
    }
    tokens
        .windows(parts.len())
        .any(|window| window.iter().zip(&parts).all(|(t, p)| t == p))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(keywords: &[&str]) -> BTreeSet<String> {
        keywords.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn tokenizes_on_non_word_characters() {
        assert_eq!(
            word_tokens("monto>100;drop table(x)"),
            vec!["MONTO", "100", "DROP", "TABLE", "X"]
        );
        assert!(word_tokens("  ;; ").is_empty());
    }

    #[test]
    fn whole_token_match_is_case_insensitive() {
        let keywords = set(&["DROP"]);
        assert_eq!(
            find_forbidden_keyword("id = 1; Drop table ventas", &keywords),
            Some("DROP")
        );
        assert_eq!(find_forbidden_keyword("x=1;DROP", &keywords), Some("DROP"));
    }

    #[test]
    fn non_ascii_keyword_matches_in_any_case() {
        let keywords = set(&["CONTRASEÑA"]);
        assert_eq!(
            find_forbidden_keyword("contraseña = 'x'", &keywords),
            Some("CONTRASEÑA")
        );
        assert_eq!(
            find_forbidden_keyword("Contraseña_vieja = 'x'", &keywords),
            None
        );
        assert_eq!(word_tokens("año>1"), vec!["AÑO", "1"]);
    }

    #[test]
    fn identifiers_containing_keyword_do_not_match() {
        let keywords = set(&["DROP", "UPDATE"]);
        assert_eq!(
            find_forbidden_keyword("dropped_at > '2024-01-01' AND last_updated IS NULL", &keywords),
            None
        );
    }

    #[test]
    fn string_literals_are_not_exempt() {
        let keywords = set(&["DELETE"]);
        assert_eq!(
            find_forbidden_keyword("comentario = 'please delete me'", &keywords),
            Some("DELETE")
        );
    }

    #[test]
    fn multi_word_keyword_matches_token_sequence() {
        let keywords = set(&["UNION SELECT"]);
        assert_eq!(
            find_forbidden_keyword("id = 1 union\n  select password", &keywords),
            Some("UNION SELECT")
        );
        assert_eq!(
            find_forbidden_keyword("tipo = 'union' and select_flag = 1", &keywords),
            None
        );
    }

    #[test]
    fn punctuation_keyword_matches_substring() {
        let keywords = set(&[";", "--"]);
        assert_eq!(find_forbidden_keyword("id = 1 -- comment", &keywords), Some("--"));
        assert_eq!(find_forbidden_keyword("id = 1; x", &keywords), Some(";"));
        assert_eq!(find_forbidden_keyword("id = 1", &keywords), None);
    }
}
