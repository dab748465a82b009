use crate::config::RenameConfig;
use crate::error::RenameError;
use crate::fs::Directory;
use crate::planner::ValidatedPlan;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApplyOptions {
    pub copy: bool,
    pub dry_run: bool,
}

impl From<&RenameConfig> for ApplyOptions {
    fn from(config: &RenameConfig) -> Self {
        Self {
            copy: config.copy,
            dry_run: config.dry_run,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Unchanged,
    Moved,
    Copied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameAction {
    pub source: String,
    pub target: String,
    pub kind: ActionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApplyResult {
    pub dry_run: bool,
    pub actions: Vec<RenameAction>,
    pub applied: usize,
    pub unchanged: usize,
}

/// Executes a validated plan in plan order. With `dry_run` set the returned
/// actions describe what would happen and the directory is left untouched.
pub fn apply_plan(
    dir: &impl Directory,
    plan: &ValidatedPlan,
    options: &ApplyOptions,
) -> Result<ApplyResult, RenameError> {
    let mut result = ApplyResult {
        dry_run: options.dry_run,
        ..ApplyResult::default()
    };

    for (source, target) in plan.entries() {
        let kind = if source == target {
            ActionKind::Unchanged
        } else if options.copy {
            ActionKind::Copied
        } else {
            ActionKind::Moved
        };

        match kind {
            ActionKind::Unchanged => result.unchanged += 1,
            _ if options.dry_run => result.applied += 1,
            ActionKind::Copied => {
                dir.copy_with_metadata(source, target).map_err(|err| {
                    RenameError::io(format!("could not copy {source} to {target}"), err)
                })?;
                result.applied += 1;
            }
            ActionKind::Moved => {
                dir.rename(source, target).map_err(|err| {
                    RenameError::io(format!("could not rename {source} to {target}"), err)
                })?;
                result.applied += 1;
            }
        }
        log::debug!("{kind:?}: {source} -> {target}");

        result.actions.push(RenameAction {
            source: source.to_string(),
            target: target.to_string(),
            kind,
        });
    }

    Ok(result)
}
