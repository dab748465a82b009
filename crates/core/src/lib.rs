mod apply;
mod batch;
mod config;
mod error;
mod expander;
mod fs;
mod index;
mod matcher;
mod planner;
pub mod selftest;
mod template;

pub use apply::{apply_plan, ActionKind, ApplyOptions, ApplyResult, RenameAction};
pub use batch::{run_batch, BatchReport};
pub use config::{
    app_paths, load_config, load_config_from, AppConfig, AppPaths,
    RenameConfig,
};
pub use error::RenameError;
pub use expander::{NameExpander, RenameRule, Transform};
pub use fs::{Directory, OsDirectory};
pub use index::{IndexDigits, IndexSequence};
pub use matcher::{separator_warnings, BatchContext, MatchRecord, Matcher, PlanWarning};
pub use planner::{generate_plan, validate_plan, PlanEntry, PlanOptions, RenamePlan, ValidatedPlan};
pub use template::{parse_template, Template, TemplatePart, Token};
