//! Rule predicates and their compiled matchers.
//!
//! A predicate is one testable condition over request text. Rules combine
//! several; how many must hold depends on the rule kind (see
//! [`super::RuleKind`]). Predicates compile once at registry load so the
//! hot path only runs prebuilt automata.

use std::collections::HashSet;
use std::sync::LazyLock;

use aho_corasick::AhoCorasick;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Path-like tokens ("src/lib.rs", "config.yaml") for the file-mention
/// predicate. Requires a letter-led extension so bare version numbers
/// ("2.5") don't count.
static FILE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9_][A-Za-z0-9_./-]*\.[A-Za-z][A-Za-z0-9]{0,7}\b").unwrap()
});

/// A single testable condition over request text.
///
/// Deserializes untagged so rule configs read naturally:
/// `{ keywords = ["typo", "rename"] }`, `{ pattern = "(?i)\\bflaky\\b" }`,
/// `{ at_least_files = 2 }`, `{ max_chars = 200 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Predicate {
    /// Any of the listed phrases appears (case-insensitive substring scan).
    Keywords { keywords: Vec<String> },
    /// The regular expression matches.
    Pattern { pattern: String },
    /// At least this many distinct file-like paths are mentioned.
    MentionsFiles { at_least_files: usize },
    /// Request text is at most this many characters.
    MaxLength { max_chars: usize },
    /// Request text is at least this many characters.
    MinLength { min_chars: usize },
    /// A fenced code block is present (true) or absent (false).
    CodeFence { code_fence: bool },
}

impl Predicate {
    /// Compile for repeated evaluation. The error is a bare message; the
    /// registry wraps it with rule and domain context.
    pub(crate) fn compile(&self) -> Result<CompiledPredicate, String> {
        match self {
            Predicate::Keywords { keywords } => {
                if keywords.is_empty() {
                    return Err("keyword list is empty".to_string());
                }
                if keywords.iter().any(|k| k.trim().is_empty()) {
                    return Err("keyword list contains a blank entry".to_string());
                }
                let automaton = AhoCorasick::builder()
                    .ascii_case_insensitive(true)
                    .build(keywords)
                    .map_err(|e| format!("failed to build keyword automaton: {e}"))?;
                Ok(CompiledPredicate::Keywords(automaton))
            }
            Predicate::Pattern { pattern } => {
                let re =
                    Regex::new(pattern).map_err(|e| format!("invalid pattern {pattern:?}: {e}"))?;
                Ok(CompiledPredicate::Pattern(re))
            }
            Predicate::MentionsFiles { at_least_files } => {
                if *at_least_files == 0 {
                    return Err("at_least_files must be at least 1".to_string());
                }
                Ok(CompiledPredicate::MentionsFiles {
                    at_least: *at_least_files,
                })
            }
            Predicate::MaxLength { max_chars } => {
                if *max_chars == 0 {
                    return Err("max_chars must be at least 1".to_string());
                }
                Ok(CompiledPredicate::MaxLength {
                    max_chars: *max_chars,
                })
            }
            Predicate::MinLength { min_chars } => {
                if *min_chars == 0 {
                    return Err("min_chars must be at least 1".to_string());
                }
                Ok(CompiledPredicate::MinLength {
                    min_chars: *min_chars,
                })
            }
            Predicate::CodeFence { code_fence } => Ok(CompiledPredicate::CodeFence {
                present: *code_fence,
            }),
        }
    }

    /// Keywords, if this is a keyword predicate. Used by the registry's
    /// override disjointness analysis.
    pub(crate) fn keyword_list(&self) -> Option<&[String]> {
        match self {
            Predicate::Keywords { keywords } => Some(keywords),
            _ => None,
        }
    }

    /// Pattern source, if this is a pattern predicate.
    pub(crate) fn pattern_source(&self) -> Option<&str> {
        match self {
            Predicate::Pattern { pattern } => Some(pattern),
            _ => None,
        }
    }
}

/// A predicate compiled for evaluation.
#[derive(Debug, Clone)]
pub(crate) enum CompiledPredicate {
    Keywords(AhoCorasick),
    Pattern(Regex),
    MentionsFiles { at_least: usize },
    MaxLength { max_chars: usize },
    MinLength { min_chars: usize },
    CodeFence { present: bool },
}

impl CompiledPredicate {
    /// Evaluate against request text.
    pub(crate) fn holds(&self, text: &str) -> bool {
        match self {
            CompiledPredicate::Keywords(automaton) => automaton.is_match(text),
            CompiledPredicate::Pattern(re) => re.is_match(text),
            CompiledPredicate::MentionsFiles { at_least } => {
                distinct_file_mentions(text) >= *at_least
            }
            CompiledPredicate::MaxLength { max_chars } => text.chars().count() <= *max_chars,
            CompiledPredicate::MinLength { min_chars } => text.chars().count() >= *min_chars,
            CompiledPredicate::CodeFence { present } => text.contains("```") == *present,
        }
    }
}

/// Count distinct path-like tokens in the text (case-insensitive).
pub(crate) fn distinct_file_mentions(text: &str) -> usize {
    let mut seen = HashSet::new();
    for m in FILE_TOKEN.find_iter(text) {
        seen.insert(m.as_str().to_ascii_lowercase());
    }
    seen.len()
}
