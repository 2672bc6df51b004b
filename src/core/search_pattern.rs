/// A free-text search term, matched as a case-insensitive substring.
///
/// The term is matched literally: `%`, `_` and `\` are escaped before the
/// term is embedded in a `LIKE` pattern, so queries cannot smuggle in
/// wildcards. Queries using the pattern must add `ESCAPE '\'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPattern {
    term: String,
    like: String,
}

impl SearchPattern {
    /// Returns `None` for a missing or blank query.
    pub fn parse(query: Option<&str>) -> Option<Self> {
        let term = query.map(str::trim).filter(|q| !q.is_empty())?;

        let mut like = String::with_capacity(term.len() + 2);
        like.push('%');
        for c in term.chars() {
            if matches!(c, '%' | '_' | '\\') {
                like.push('\\');
            }
            like.push(c);
        }
        like.push('%');

        Some(Self {
            term: term.to_string(),
            like,
        })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn like_pattern(&self) -> &str {
        &self.like
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_queries_have_no_pattern() {
        assert_eq!(SearchPattern::parse(None), None);
        assert_eq!(SearchPattern::parse(Some("")), None);
        assert_eq!(SearchPattern::parse(Some("   \t")), None);
    }

    #[test]
    fn test_term_is_trimmed() {
        let pattern = SearchPattern::parse(Some("  sunset ")).unwrap();
        assert_eq!(pattern.term(), "sunset");
        assert_eq!(pattern.like_pattern(), "%sunset%");
    }

    #[test]
    fn test_wildcards_are_escaped() {
        let pattern = SearchPattern::parse(Some(r"50%_off\")).unwrap();
        assert_eq!(pattern.like_pattern(), r"%50\%\_off\\%");
    }

    #[test]
    fn test_regex_metacharacters_pass_through_literally() {
        let pattern = SearchPattern::parse(Some("(a+)+$")).unwrap();
        assert_eq!(pattern.like_pattern(), "%(a+)+$%");
    }
}
