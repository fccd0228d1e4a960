use crate::error::{Error, Result};
use crate::query::matcher::TermMatcher;
use serde::{Deserialize, Serialize};

/// Matching options for one term
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermFlags {
    /// Require word boundaries on both sides
    pub whole_word: bool,
    /// Match letter case exactly
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    Include,
    Exclude,
}

/// One term of an advanced query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTerm {
    pub kind: TermKind,
    pub term: String,
    #[serde(default)]
    pub whole_word: bool,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl SearchTerm {
    pub fn include(term: impl Into<String>, flags: TermFlags) -> Self {
        Self::with_kind(TermKind::Include, term, flags)
    }

    pub fn exclude(term: impl Into<String>, flags: TermFlags) -> Self {
        Self::with_kind(TermKind::Exclude, term, flags)
    }

    fn with_kind(kind: TermKind, term: impl Into<String>, flags: TermFlags) -> Self {
        Self {
            kind,
            term: term.into(),
            whole_word: flags.whole_word,
            case_sensitive: flags.case_sensitive,
        }
    }

    pub fn flags(&self) -> TermFlags {
        TermFlags {
            whole_word: self.whole_word,
            case_sensitive: self.case_sensitive,
        }
    }
}

/// What a search looks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPredicate {
    /// Lines containing `term`
    Simple { term: String, flags: TermFlags },
    /// Lines matching every include term and no exclude term
    Advanced { terms: Vec<SearchTerm> },
}

impl SearchPredicate {
    pub fn simple(term: impl Into<String>, flags: TermFlags) -> Result<Self> {
        let term = term.into();
        if term.is_empty() {
            return Err(Error::InvalidQuery("search term is empty".to_string()));
        }
        Ok(SearchPredicate::Simple { term, flags })
    }

    /// An advanced query. At least one term is required; a set of only
    /// exclude terms matches every line that none of them match.
    pub fn advanced(terms: Vec<SearchTerm>) -> Result<Self> {
        if terms.is_empty() {
            return Err(Error::InvalidQuery("advanced search has no terms".to_string()));
        }
        if let Some(empty) = terms.iter().position(|t| t.term.is_empty()) {
            return Err(Error::InvalidQuery(format!("term {} is empty", empty + 1)));
        }
        Ok(SearchPredicate::Advanced { terms })
    }

    pub fn compile(&self) -> Result<CompiledPredicate> {
        CompiledPredicate::new(self)
    }

    /// Short description for logs and headers
    pub fn describe(&self) -> String {
        match self {
            SearchPredicate::Simple { term, .. } => format!("{:?}", term),
            SearchPredicate::Advanced { terms } => terms
                .iter()
                .map(|t| match t.kind {
                    TermKind::Include => format!("+{:?}", t.term),
                    TermKind::Exclude => format!("-{:?}", t.term),
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Assembles a predicate from a main search box term and extra terms.
///
/// With no extra terms the result is a simple query. Otherwise the main term
/// is prepended as an include term, unless a term with the same text is
/// already present, and the result is an advanced query.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    main: Option<(String, TermFlags)>,
    extra: Vec<SearchTerm>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main_term(mut self, term: &str, flags: TermFlags) -> Self {
        let term = term.trim();
        self.main = (!term.is_empty()).then(|| (term.to_string(), flags));
        self
    }

    pub fn include(mut self, term: &str, flags: TermFlags) -> Self {
        self.push(TermKind::Include, term, flags);
        self
    }

    pub fn exclude(mut self, term: &str, flags: TermFlags) -> Self {
        self.push(TermKind::Exclude, term, flags);
        self
    }

    fn push(&mut self, kind: TermKind, term: &str, flags: TermFlags) {
        let term = term.trim();
        if !term.is_empty() {
            self.extra.push(SearchTerm::with_kind(kind, term, flags));
        }
    }

    pub fn build(self) -> Result<SearchPredicate> {
        if self.extra.is_empty() {
            return match self.main {
                Some((term, flags)) => SearchPredicate::simple(term, flags),
                None => Err(Error::InvalidQuery("no search term given".to_string())),
            };
        }

        let mut terms = self.extra;
        if let Some((main, flags)) = self.main {
            if !terms.iter().any(|t| t.term == main) {
                terms.insert(0, SearchTerm::include(main, flags));
            }
        }
        SearchPredicate::advanced(terms)
    }
}

/// A predicate with its regexes built, ready to test lines
#[derive(Debug, Clone)]
pub enum CompiledPredicate {
    Simple(TermMatcher),
    Advanced {
        includes: Vec<TermMatcher>,
        excludes: Vec<TermMatcher>,
    },
    /// A predicate built without the validating constructors: no terms, or
    /// an empty term. Matches no line.
    Nothing,
}

impl CompiledPredicate {
    pub fn new(predicate: &SearchPredicate) -> Result<Self> {
        match predicate {
            SearchPredicate::Simple { term, .. } if term.is_empty() => Ok(CompiledPredicate::Nothing),
            SearchPredicate::Simple { term, flags } => {
                Ok(CompiledPredicate::Simple(TermMatcher::new(term, *flags)?))
            }
            SearchPredicate::Advanced { terms } if terms.is_empty() || terms.iter().any(|t| t.term.is_empty()) => {
                Ok(CompiledPredicate::Nothing)
            }
            SearchPredicate::Advanced { terms } => {
                let mut includes = Vec::new();
                let mut excludes = Vec::new();
                for term in terms {
                    let matcher = TermMatcher::new(&term.term, term.flags())?;
                    match term.kind {
                        TermKind::Include => includes.push(matcher),
                        TermKind::Exclude => excludes.push(matcher),
                    }
                }
                Ok(CompiledPredicate::Advanced { includes, excludes })
            }
        }
    }

    pub fn is_match(&self, line: &str) -> bool {
        match self {
            CompiledPredicate::Simple(matcher) => matcher.is_match(line),
            CompiledPredicate::Advanced { includes, excludes } => {
                !excludes.iter().any(|m| m.is_match(line)) && includes.iter().all(|m| m.is_match(line))
            }
            CompiledPredicate::Nothing => false,
        }
    }

    /// Byte ranges to highlight in a matching line: every occurrence of the
    /// simple term or of any include term, sorted and merged
    pub fn highlight_ranges(&self, line: &str) -> Vec<(usize, usize)> {
        let mut ranges = match self {
            CompiledPredicate::Simple(matcher) => matcher.find_ranges(line),
            CompiledPredicate::Advanced { includes, .. } => {
                includes.iter().flat_map(|m| m.find_ranges(line)).collect()
            }
            CompiledPredicate::Nothing => Vec::new(),
        };
        ranges.sort_unstable();

        let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            match merged.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(predicate: &SearchPredicate, lines: &[&str]) -> Vec<usize> {
        let compiled = predicate.compile().unwrap();
        lines
            .iter()
            .enumerate()
            .filter(|(_, l)| compiled.is_match(l))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_include_exclude_scenario() {
        let predicate = SearchPredicate::advanced(vec![
            SearchTerm::include("fail", TermFlags::default()),
            SearchTerm::exclude("ok", TermFlags::default()),
        ])
        .unwrap();
        assert_eq!(matches(&predicate, &["fail here", "fail ok", "passed"]), vec![0]);
    }

    #[test]
    fn test_exclude_only_matches_everything_else() {
        let predicate =
            SearchPredicate::advanced(vec![SearchTerm::exclude("debug", TermFlags::default())]).unwrap();
        assert_eq!(matches(&predicate, &["info a", "DEBUG b", "warn c"]), vec![0, 2]);
    }

    #[test]
    fn test_all_includes_required() {
        let predicate = SearchPredicate::advanced(vec![
            SearchTerm::include("disk", TermFlags::default()),
            SearchTerm::include("full", TermFlags::default()),
        ])
        .unwrap();
        assert_eq!(matches(&predicate, &["disk full", "disk ok", "full"]), vec![0]);
    }

    #[test]
    fn test_empty_inputs_are_rejected() {
        assert!(matches!(SearchPredicate::advanced(vec![]), Err(Error::InvalidQuery(_))));
        assert!(matches!(
            SearchPredicate::simple("", TermFlags::default()),
            Err(Error::InvalidQuery(_))
        ));
        assert!(matches!(QueryBuilder::new().build(), Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn test_unvalidated_empty_advanced_matches_nothing() {
        let predicate = SearchPredicate::Advanced { terms: vec![] };
        assert!(matches(&predicate, &["anything", ""]).is_empty());
    }

    #[test]
    fn test_unvalidated_empty_terms_match_nothing() {
        let simple = SearchPredicate::Simple {
            term: String::new(),
            flags: TermFlags::default(),
        };
        assert!(matches(&simple, &["a", "b", ""]).is_empty());

        let advanced = SearchPredicate::Advanced {
            terms: vec![
                SearchTerm::include("", TermFlags::default()),
                SearchTerm::exclude("b", TermFlags::default()),
            ],
        };
        assert!(matches(&advanced, &["a", "b", ""]).is_empty());
    }

    #[test]
    fn test_builder_simple_without_extra_terms() {
        let predicate = QueryBuilder::new()
            .main_term("  timeout ", TermFlags::default())
            .build()
            .unwrap();
        assert_eq!(
            predicate,
            SearchPredicate::Simple {
                term: "timeout".to_string(),
                flags: TermFlags::default()
            }
        );
    }

    #[test]
    fn test_builder_prepends_main_term() {
        let flags = TermFlags {
            whole_word: true,
            case_sensitive: false,
        };
        let predicate = QueryBuilder::new()
            .main_term("error", flags)
            .exclude("retry", TermFlags::default())
            .build()
            .unwrap();
        let SearchPredicate::Advanced { terms } = predicate else {
            panic!("expected advanced query");
        };
        assert_eq!(terms[0], SearchTerm::include("error", flags));
        assert_eq!(terms[1].kind, TermKind::Exclude);
    }

    #[test]
    fn test_builder_does_not_duplicate_main_term() {
        let predicate = QueryBuilder::new()
            .main_term("error", TermFlags::default())
            .exclude("error", TermFlags::default())
            .build()
            .unwrap();
        let SearchPredicate::Advanced { terms } = predicate else {
            panic!("expected advanced query");
        };
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].kind, TermKind::Exclude);
    }

    #[test]
    fn test_highlight_ranges_merge_overlaps() {
        let predicate = SearchPredicate::advanced(vec![
            SearchTerm::include("disk", TermFlags::default()),
            SearchTerm::include("isk f", TermFlags::default()),
            SearchTerm::exclude("ok", TermFlags::default()),
        ])
        .unwrap();
        let compiled = predicate.compile().unwrap();
        assert_eq!(compiled.highlight_ranges("a disk full"), vec![(2, 8)]);
    }

    #[test]
    fn test_term_serializes_with_lowercase_kind() {
        let term = SearchTerm::exclude("ok", TermFlags::default());
        let json = serde_json::to_string(&term).unwrap();
        assert!(json.contains(r#""kind":"exclude""#));
        let back: SearchTerm = serde_json::from_str(&json).unwrap();
        assert_eq!(back, term);
    }
}
