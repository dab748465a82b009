use crate::config::RenameConfig;
use crate::error::RenameError;
use crate::expander::{NameExpander, RenameRule};
use crate::fs::Directory;
use crate::matcher::{separator_warnings, Matcher, PlanWarning};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOptions {
    pub regex: String,
    pub rule: RenameRule,
    pub except_regex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub target: String,
    pub sources: Vec<String>,
}

/// Targets in the order they were first produced, each with every source
/// that expanded to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePlan {
    pub entries: Vec<PlanEntry>,
    pub candidates: usize,
    pub warnings: Vec<PlanWarning>,
}

/// A plan that passed both validation passes. Only `validate_plan` builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPlan {
    plan: RenamePlan,
}

impl ValidatedPlan {
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.plan
            .entries
            .iter()
            .map(|entry| (entry.sources[0].as_str(), entry.target.as_str()))
    }

    pub fn into_plan(self) -> RenamePlan {
        self.plan
    }
}

pub fn generate_plan(
    dir: &impl Directory,
    options: &PlanOptions,
    config: &RenameConfig,
) -> Result<RenamePlan, RenameError> {
    let (target, from, to) = match &options.rule {
        RenameRule::Template(template) => (Some(template.as_str()), None, None),
        RenameRule::Substring { from, to } => (None, Some(from.as_str()), Some(to.as_str())),
    };
    let warnings = separator_warnings(&[
        ("regex", Some(options.regex.as_str())),
        ("target", target),
        ("except_regex", options.except_regex.as_deref()),
        ("substring_from", from),
        ("substring_to", to),
    ]);
    for warning in &warnings {
        log::debug!("{warning}");
    }

    let matcher = Matcher::new(
        &options.regex,
        options.except_regex.as_deref(),
        config.case_insensitive,
    )?;
    let expander = NameExpander::new(&options.rule, config.case_insensitive)?;
    if let NameExpander::Template(template) = &expander {
        template.check_groups(matcher.group_count())?;
    }

    log::debug!("scanning directory");
    let listing = dir
        .list_names()
        .map_err(|err| RenameError::io("could not list directory", err))?;
    let context = matcher.context(listing);
    let total = context.total();

    log::debug!("expanding names for {total} candidate(s)");
    let mut entries = Vec::<PlanEntry>::new();
    let mut by_target = HashMap::<String, usize>::new();
    for record in matcher.scan(&context) {
        let target = expander.expand(
            &record.captures,
            &config.index,
            record.position,
            total,
            config.transform,
        )?;
        log::debug!("{} -> {}", record.source, target);

        match by_target.get(&target) {
            Some(&slot) => entries[slot].sources.push(record.source.to_string()),
            None => {
                by_target.insert(target.clone(), entries.len());
                entries.push(PlanEntry {
                    target,
                    sources: vec![record.source.to_string()],
                });
            }
        }
    }

    Ok(RenamePlan {
        entries,
        candidates: total,
        warnings,
    })
}

pub fn validate_plan(
    dir: &impl Directory,
    plan: RenamePlan,
) -> Result<ValidatedPlan, RenameError> {
    log::debug!("validating {} planned target(s)", plan.entries.len());

    if let Some(entry) = plan.entries.iter().find(|entry| entry.sources.len() > 1) {
        return Err(RenameError::Collision {
            target: entry.target.clone(),
            sources: entry.sources.clone(),
        });
    }

    for entry in &plan.entries {
        let source = &entry.sources[0];
        if *source == entry.target {
            continue;
        }
        let exists = dir
            .exists(&entry.target)
            .map_err(|err| RenameError::io(format!("could not stat {}", entry.target), err))?;
        if !exists {
            continue;
        }
        let same = dir.is_same_file(&entry.target, source).map_err(|err| {
            RenameError::io(
                format!("could not compare {} with {}", entry.target, source),
                err,
            )
        })?;
        if !same {
            return Err(RenameError::TargetExists {
                target: entry.target.clone(),
                source_name: source.clone(),
            });
        }
        log::debug!("{source} and {} are the same file", entry.target);
    }

    Ok(ValidatedPlan { plan })
}
