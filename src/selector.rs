// SPDX-License-Identifier: Apache-2.0

use regex::Regex;

use crate::error::{Diagnostic, Result};

/// A uniform way to pick entities out of a catalog by name.
///
/// Every `list`/`load`/`save`/`remove` entry point on the bus and module
/// catalogs accepts a `Selector` rather than a bare string or regex, so the
/// matching rule only has to be implemented once.
#[derive(Clone, Debug)]
pub enum Selector {
    Exact(String),
    Pattern(Regex),
    Any,
    List(Vec<Selector>),
}

impl Selector {
    /// Compiles a user-supplied regex into a `Pattern` selector. An empty
    /// or syntactically invalid pattern is rejected, matching the rule that
    /// regex selectors must be "non-empty and syntactically valid".
    pub fn pattern(raw: &str) -> Result<Selector> {
        if raw.trim().is_empty() {
            return Err(Diagnostic::InvalidSelector(raw.to_string()));
        }
        let exact = format!("^(?:{raw})$");
        Regex::new(&exact)
            .map(Selector::Pattern)
            .map_err(|_| Diagnostic::InvalidSelector(raw.to_string()))
    }

    /// Whole-string match: a `Pattern` must match the entire candidate, not
    /// a prefix or substring (the identifier-utilities exact-match rule).
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Selector::Exact(name) => name == candidate,
            Selector::Pattern(re) => re.is_match(candidate),
            Selector::Any => true,
            Selector::List(items) => items.iter().any(|s| s.matches(candidate)),
        }
    }

    pub fn filter<'a, I>(&self, candidates: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates.into_iter().filter(|c| self.matches(c)).collect()
    }
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        Selector::Exact(value.to_string())
    }
}

impl From<String> for Selector {
    fn from(value: String) -> Self {
        Selector::Exact(value)
    }
}

/// Tests a name against a regex with exact-match semantics: the regex must
/// match the entire name, not a prefix.
pub fn is_name_regex_valid(raw: &str) -> bool {
    !raw.trim().is_empty() && Regex::new(raw).is_ok()
}

pub fn is_name_exact_match(raw: &str, candidate: &str) -> bool {
    match Regex::new(&format!("^(?:{raw})$")) {
        Ok(re) => re.is_match(candidate),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_matches_whole_string_only() {
        let sel = Selector::pattern("multi_apb").unwrap();
        assert!(sel.matches("multi_apb"));
        assert!(!sel.matches("multi_apb_extra"));
        assert!(!sel.matches("pre_multi_apb"));
    }

    #[test]
    fn empty_pattern_is_rejected() {
        assert!(Selector::pattern("").is_err());
        assert!(Selector::pattern("   ").is_err());
    }

    #[test]
    fn any_matches_everything() {
        assert!(Selector::Any.matches("whatever"));
    }

    #[test]
    fn list_matches_union() {
        let sel = Selector::List(vec![
            Selector::Exact("a".into()),
            Selector::Exact("b".into()),
        ]);
        assert!(sel.matches("a"));
        assert!(sel.matches("b"));
        assert!(!sel.matches("c"));
    }

    #[test]
    fn exact_match_helper_requires_full_string() {
        assert!(is_name_exact_match("apb", "apb"));
        assert!(!is_name_exact_match("apb", "apb2"));
    }
}
