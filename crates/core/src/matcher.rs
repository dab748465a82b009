use crate::error::RenameError;
use regex::{Captures, Regex, RegexBuilder};
use serde::Serialize;
use std::fmt;
use std::path::MAIN_SEPARATOR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanWarning {
    PathSeparator { argument: &'static str },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathSeparator { argument } => write!(
                f,
                "{MAIN_SEPARATOR} found in <{argument}> but this tool doesn't support directory traversal."
            ),
        }
    }
}

/// Returns a warning for every named argument that contains a path separator.
pub fn separator_warnings(arguments: &[(&'static str, Option<&str>)]) -> Vec<PlanWarning> {
    arguments
        .iter()
        .filter(|(_, value)| value.is_some_and(|v| v.contains(MAIN_SEPARATOR)))
        .map(|(argument, _)| PlanWarning::PathSeparator {
            argument: *argument,
        })
        .collect()
}

/// The listing a batch works on, after exclusions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchContext {
    pub candidates: Vec<String>,
}

impl BatchContext {
    pub fn total(&self) -> usize {
        self.candidates.len()
    }
}

#[derive(Debug)]
pub struct MatchRecord<'a> {
    pub source: &'a str,
    pub position: usize,
    pub captures: Captures<'a>,
}

#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: Regex,
    except: Option<Regex>,
}

impl Matcher {
    pub fn new(
        regex: &str,
        except_regex: Option<&str>,
        case_insensitive: bool,
    ) -> Result<Self, RenameError> {
        let pattern = RegexBuilder::new(&format!("^(?:{regex})$"))
            .case_insensitive(case_insensitive)
            .build()?;
        let except = except_regex
            .filter(|v| !v.is_empty())
            .map(|v| RegexBuilder::new(v).case_insensitive(case_insensitive).build())
            .transpose()?;
        Ok(Self { pattern, except })
    }

    /// Number of capture groups, including the implicit whole-match group.
    pub fn group_count(&self) -> usize {
        self.pattern.captures_len()
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.except.as_ref().is_some_and(|re| re.is_match(name))
    }

    pub fn context(&self, listing: Vec<String>) -> BatchContext {
        let candidates = listing
            .into_iter()
            .filter(|name| {
                let excluded = self.is_excluded(name);
                if excluded {
                    log::debug!("excluded: {name}");
                }
                !excluded
            })
            .collect();
        BatchContext { candidates }
    }

    /// Matches every candidate in listing order. Positions count all
    /// candidates, matched or not.
    pub fn scan<'a>(&'a self, context: &'a BatchContext) -> impl Iterator<Item = MatchRecord<'a>> {
        context
            .candidates
            .iter()
            .enumerate()
            .filter_map(|(position, source)| {
                let captures = self.pattern.captures(source)?;
                Some(MatchRecord {
                    source,
                    position,
                    captures,
                })
            })
    }
}
