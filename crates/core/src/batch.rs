use crate::apply::{apply_plan, ApplyOptions, ApplyResult};
use crate::config::RenameConfig;
use crate::error::RenameError;
use crate::fs::Directory;
use crate::matcher::PlanWarning;
use crate::planner::{generate_plan, validate_plan, PlanOptions};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub candidates: usize,
    pub warnings: Vec<PlanWarning>,
    #[serde(flatten)]
    pub result: ApplyResult,
}

/// Runs one batch: build the whole plan, validate it, then execute it.
/// Nothing is touched on disk unless validation passes for every entry.
///
/// Warnings are returned through `on_warning` as soon as they are known, so
/// callers can show them even when the batch later fails.
pub fn run_batch(
    dir: &impl Directory,
    options: &PlanOptions,
    config: &RenameConfig,
    mut on_warning: impl FnMut(&PlanWarning),
) -> Result<BatchReport, RenameError> {
    let plan = generate_plan(dir, options, config)?;
    plan.warnings.iter().for_each(&mut on_warning);

    let validated = validate_plan(dir, plan)?;
    log::debug!("plan is valid, executing");
    let result = apply_plan(dir, &validated, &ApplyOptions::from(config))?;

    let plan = validated.into_plan();
    Ok(BatchReport {
        candidates: plan.candidates,
        warnings: plan.warnings,
        result,
    })
}
