//! Search-query normalization
//!
//! One canonical strategy: both the indexed text and the query are
//! case-folded, accent-stripped, and whitespace-collapsed before matching.
//! A query containing two consecutive spaces is a reference lookup and is
//! matched against the reference column only.

/// Marks a query as a reference lookup when present anywhere after the
/// leading whitespace.
pub const REFERENCE_DELIMITER: &str = "  ";

/// Whether the query should be matched against the reference column only.
#[must_use]
pub fn is_reference_query(query: &str) -> bool {
    query.trim_start().contains(REFERENCE_DELIMITER)
}

/// Lowercase, strip Latin diacritics, and collapse runs of whitespace.
#[must_use]
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_diacritic)
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build an FTS5 MATCH expression for a free-text query.
///
/// Strips everything but alphanumerics and spaces so user input can never
/// produce an FTS syntax error, then appends a trailing wildcard for
/// partial matches. Returns an empty string when nothing searchable is
/// left.
#[must_use]
pub fn fts_match_expression(query: &str) -> String {
    let cleaned: String = normalize(query)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == ' ' {
                c
            } else {
                ' '
            }
        })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        String::new()
    } else {
        format!("{collapsed}*")
    }
}

/// Fold common Latin diacritics to their ASCII base letter.
///
/// Covers the accents that actually occur in the upstream catalog text
/// (Spanish plus close neighbours); anything else passes through.
const fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reference_query_detected_after_leading_whitespace() {
        assert!(is_reference_query("REF  "));
        assert!(is_reference_query("   REF  123"));
        assert!(!is_reference_query("   taladro percutor"));
        assert!(!is_reference_query("taladro"));
    }

    #[test]
    fn normalize_folds_case_and_accents() {
        assert_eq!(normalize("Cinta MÉTRICA"), "cinta metrica");
        assert_eq!(normalize("  Tornillería\t inox "), "tornilleria inox");
        assert_eq!(normalize("NIÑO açaí"), "nino acai");
    }

    #[test]
    fn fts_expression_strips_metacharacters() {
        assert_eq!(fts_match_expression("taladro"), "taladro*");
        assert_eq!(fts_match_expression("\"taladro*\""), "taladro*");
        assert_eq!(fts_match_expression("brocas (5mm)"), "brocas 5mm*");
        assert_eq!(fts_match_expression("col:umn^rank"), "col umn rank*");
    }

    #[test]
    fn fts_expression_empty_when_nothing_searchable() {
        assert_eq!(fts_match_expression("  \"* \" "), "");
        assert_eq!(fts_match_expression(""), "");
    }
}
