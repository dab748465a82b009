use crate::error::RenameError;
use crate::index::IndexSequence;
use crate::template::{parse_template, Template};
use regex::{Captures, NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    #[default]
    Identity,
    Lower,
    Upper,
}

impl Transform {
    pub fn apply(self, name: String) -> String {
        match self {
            Self::Identity => name,
            Self::Lower => name.to_lowercase(),
            Self::Upper => name.to_uppercase(),
        }
    }
}

/// How a destination name is derived from a matched entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameRule {
    Template(String),
    Substring { from: String, to: String },
}

#[derive(Debug, Clone)]
pub enum NameExpander {
    Template(Template),
    Substring { pattern: Regex, replacement: String },
}

impl NameExpander {
    pub fn new(rule: &RenameRule, case_insensitive: bool) -> Result<Self, RenameError> {
        match rule {
            RenameRule::Template(template) => Ok(Self::Template(parse_template(template)?)),
            RenameRule::Substring { from, to } => {
                let pattern = RegexBuilder::new(&regex::escape(from))
                    .case_insensitive(case_insensitive)
                    .build()?;
                Ok(Self::Substring {
                    pattern,
                    replacement: to.clone(),
                })
            }
        }
    }

    pub fn expand(
        &self,
        captures: &Captures<'_>,
        index: &IndexSequence,
        position: usize,
        total: usize,
        transform: Transform,
    ) -> Result<String, RenameError> {
        let expanded = match self {
            Self::Template(template) => template.render(captures, index, position, total)?,
            Self::Substring {
                pattern,
                replacement,
            } => {
                let matched = captures.get(0).map(|m| m.as_str()).unwrap_or_default();
                pattern
                    .replace_all(matched, NoExpand(replacement))
                    .into_owned()
            }
        };
        Ok(transform.apply(expanded))
    }
}
