//! Label matchers used by vector selectors.

use std::fmt;

use regex::Regex;
use strum_macros::{Display, EnumString, IntoStaticStr};

use promgraph_error::{Error, ErrorKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum MatchKind {
    #[strum(serialize = "=")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "=~")]
    RegexMatch,
    #[strum(serialize = "!~")]
    RegexNoMatch,
}

/// A `(label, value, kind)` predicate on label values.
///
/// Regular expressions are anchored at both ends, so `=~"foo"` only matches
/// the whole value `foo`.
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    name: String,
    value: String,
    kind: MatchKind,
    regex: Option<Regex>,
}

impl LabelMatcher {
    pub fn new(kind: MatchKind, name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let value = value.into();
        let regex = match kind {
            MatchKind::RegexMatch | MatchKind::RegexNoMatch => {
                let anchored = format!("^(?:{value})$");
                let regex = Regex::new(&anchored).map_err(|err| {
                    Error::new(
                        ErrorKind::ParseFailed,
                        format!("invalid regular expression in matcher {name}{kind}{value:?}"),
                    )
                    .with_operation("promql::matcher")
                    .set_source(err)
                })?;
                Some(regex)
            }
            MatchKind::Equal | MatchKind::NotEqual => None,
        };
        Ok(Self {
            name,
            value,
            kind,
            regex,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> MatchKind {
        self.kind
    }

    /// Whether `candidate` satisfies this matcher.
    pub fn matches(&self, candidate: &str) -> bool {
        match (self.kind, &self.regex) {
            (MatchKind::Equal, _) => self.value == candidate,
            (MatchKind::NotEqual, _) => self.value != candidate,
            (MatchKind::RegexMatch, Some(re)) => re.is_match(candidate),
            (MatchKind::RegexNoMatch, Some(re)) => !re.is_match(candidate),
            // Regex kinds always carry a compiled regex.
            (MatchKind::RegexMatch | MatchKind::RegexNoMatch, None) => false,
        }
    }

    pub fn matches_empty(&self) -> bool {
        self.matches("")
    }
}

impl PartialEq for LabelMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value && self.kind == other.kind
    }
}

impl Eq for LabelMatcher {}

impl fmt::Display for LabelMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{:?}", self.name, self.kind, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_matchers() {
        let eq = LabelMatcher::new(MatchKind::Equal, "alertname", "HighLoad").unwrap();
        assert!(eq.matches("HighLoad"));
        assert!(!eq.matches("HighLoadCritical"));

        let ne = LabelMatcher::new(MatchKind::NotEqual, "alertname", "HighLoad").unwrap();
        assert!(!ne.matches("HighLoad"));
        assert!(ne.matches("Other"));
    }

    #[test]
    fn test_regex_matchers_are_anchored() {
        let re = LabelMatcher::new(MatchKind::RegexMatch, "alertname", "High.*").unwrap();
        assert!(re.matches("HighLoad"));
        assert!(!re.matches("VeryHighLoad"));

        let nre = LabelMatcher::new(MatchKind::RegexNoMatch, "alertname", "a|b").unwrap();
        assert!(!nre.matches("a"));
        assert!(nre.matches("ab"));
    }

    #[test]
    fn test_alternation_is_grouped() {
        let re = LabelMatcher::new(MatchKind::RegexMatch, "job", "api|web").unwrap();
        assert!(re.matches("api"));
        assert!(re.matches("web"));
        assert!(!re.matches("apix"));
        assert!(!re.matches("xweb"));
    }

    #[test]
    fn test_invalid_regex() {
        let err = LabelMatcher::new(MatchKind::RegexMatch, "job", "(").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailed);
    }

    #[test]
    fn test_display_and_kind_parse() {
        let m = LabelMatcher::new(MatchKind::RegexMatch, "job", "api").unwrap();
        assert_eq!(m.to_string(), "job=~\"api\"");
        assert_eq!("!~".parse::<MatchKind>().unwrap(), MatchKind::RegexNoMatch);
        assert!(!m.matches_empty());
    }
}
