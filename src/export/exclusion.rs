//! Exclusion rules for keeping sensitive sessions out of an export.
//!
//! A rules file holds one rule per line; blank lines and `#` comments are
//! ignored. A rule is a sequence of terms joined by `AND` / `OR`
//! (case-insensitive). `AND` binds tighter than `OR`, and adjacent terms
//! without an operator are ANDed. A term is a bare word or a `"quoted phrase"`
//! and matches as a case-insensitive substring; an empty `""` never matches.
//!
//! ```text
//! # anything mentioning secrets
//! secret OR internal
//! "project alpha" AND confidential
//! ```
//!
//! A session is excluded when any rule matches its searchable text.

use crate::model::Session;
use std::path::Path;
use tracing::{debug, warn};

/// One parsed rule in disjunctive normal form: any clause whose terms all
/// match makes the rule match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    clauses: Vec<Vec<String>>,
}

impl Rule {
    /// Parse one rule line. Returns `None` when it holds no terms.
    pub fn parse(line: &str) -> Option<Self> {
        let mut clauses = Vec::new();
        let mut current: Vec<String> = Vec::new();

        for token in tokenize(line) {
            match token {
                Token::Or => {
                    if !current.is_empty() {
                        clauses.push(std::mem::take(&mut current));
                    }
                }
                Token::And => {}
                Token::Term(term) => current.push(term.to_lowercase()),
            }
        }
        if !current.is_empty() {
            clauses.push(current);
        }

        (!clauses.is_empty()).then_some(Self { clauses })
    }

    /// Match against text that is already lowercased. An empty term never
    /// matches, so a clause holding one is always false.
    fn matches_lower(&self, text: &str) -> bool {
        self.clauses.iter().any(|clause| {
            clause
                .iter()
                .all(|term| !term.is_empty() && text.contains(term.as_str()))
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    And,
    Or,
    Term(String),
}

fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = line.trim();

    while !rest.is_empty() {
        if let Some(after_quote) = rest.strip_prefix('"') {
            match after_quote.find('"') {
                Some(end) => {
                    tokens.push(Token::Term(after_quote[..end].to_string()));
                    rest = after_quote[end + 1..].trim_start();
                }
                None => {
                    tokens.push(Token::Term(after_quote.trim().to_string()));
                    break;
                }
            }
            continue;
        }

        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let word = &rest[..end];
        tokens.push(if word.eq_ignore_ascii_case("and") {
            Token::And
        } else if word.eq_ignore_ascii_case("or") {
            Token::Or
        } else {
            Token::Term(word.to_string())
        });
        rest = rest[end..].trim_start();
    }
    tokens
}

/// A loaded set of exclusion rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionRules {
    rules: Vec<Rule>,
}

impl ExclusionRules {
    /// Parse the contents of a rules file.
    pub fn parse(content: &str) -> Self {
        let rules = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(Rule::parse)
            .collect();
        Self { rules }
    }

    /// Load rules from `path`.
    ///
    /// A missing or unreadable file yields no rules; unreadable files are
    /// reported with a warning since filtering is then silently off.
    pub fn load(path: &Path) -> Self {
        if !path.is_file() {
            debug!(path = %path.display(), "No exclusion rules file");
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let rules = Self::parse(&content);
                debug!(path = %path.display(), rules = rules.len(), "Loaded exclusion rules");
                rules
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read exclusion rules; no filtering applied");
                Self::default()
            }
        }
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rules are loaded.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// True when any rule matches `text`.
    pub fn is_excluded(&self, text: &str) -> bool {
        if self.rules.is_empty() || text.is_empty() {
            return false;
        }
        let lower = text.to_lowercase();
        self.rules.iter().any(|rule| rule.matches_lower(&lower))
    }

    /// True when any rule matches the session's searchable text.
    pub fn excludes_session(&self, project_display: &str, session: &Session) -> bool {
        !self.rules.is_empty() && self.is_excluded(&searchable_text(project_display, session))
    }
}

/// Project display name, session title, model ids and message texts joined
/// with newlines.
pub fn searchable_text(project_display: &str, session: &Session) -> String {
    let mut parts: Vec<&str> = vec![project_display, session.title()];
    parts.extend(session.metadata().models_used.iter().map(|m| m.id()));
    parts.extend(session.text_items().map(|(_, text)| text));
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_word_is_substring_match() {
        let rules = ExclusionRules::parse("password");
        assert!(rules.is_excluded("my PASSWORDS file"));
        assert!(!rules.is_excluded("nothing here"));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let rules = ExclusionRules::parse("a OR b AND c");
        assert!(rules.is_excluded("a"));
        assert!(rules.is_excluded("b c"));
        assert!(!rules.is_excluded("b"));
    }

    #[test]
    fn adjacent_terms_are_anded() {
        let rules = ExclusionRules::parse("alpha beta");
        assert!(!rules.is_excluded("alpha"));
        assert!(rules.is_excluded("beta then alpha"));
    }

    #[test]
    fn quoted_phrases_match_as_a_whole() {
        let rules = ExclusionRules::parse("\"project alpha\" and confidential");
        assert!(rules.is_excluded("Project Alpha is CONFIDENTIAL"));
        assert!(!rules.is_excluded("project beta alpha confidential"));
    }

    #[test]
    fn unterminated_quote_takes_rest_of_line() {
        let rule = Rule::parse("\"top secret").unwrap();
        assert_eq!(rule.clauses, vec![vec!["top secret".to_string()]]);
    }

    #[test]
    fn empty_quoted_term_makes_its_clause_false() {
        let rules = ExclusionRules::parse("\"\" AND secret");
        assert!(!rules.is_excluded("a secret plan"));

        let rules = ExclusionRules::parse("\"\" AND secret OR internal");
        assert!(!rules.is_excluded("a secret plan"));
        assert!(rules.is_excluded("internal memo"));
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let rules = ExclusionRules::parse("# comment\n\n  \nsecret\n# another");
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn operator_only_rules_are_dropped() {
        assert_eq!(Rule::parse("AND OR"), None);
        assert_eq!(ExclusionRules::parse("or").len(), 0);
    }

    #[test]
    fn empty_rules_or_text_never_exclude() {
        assert!(!ExclusionRules::default().is_excluded("anything"));
        assert!(!ExclusionRules::parse("x").is_excluded(""));
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ExclusionRules::load(&dir.path().join("missing.txt")).is_empty());
    }

    #[test]
    fn load_reads_rules_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.txt");
        std::fs::write(&path, "secret OR internal\n").unwrap();
        let rules = ExclusionRules::load(&path);
        assert!(rules.is_excluded("INTERNAL memo"));
    }
}
