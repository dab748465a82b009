use anyhow::Result;
use batch_rename_core::{
    app_paths, load_config, load_config_from, run_batch, selftest, ActionKind, AppConfig,
    BatchReport, IndexDigits, OsDirectory, PlanOptions, RenameConfig, RenameError, RenameRule,
    Transform,
};
use clap::{Args, Parser, ValueEnum};
use env_logger::Env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const SELFTEST_FIXTURE_FAILURE: u8 = 10;

/// Flags shared by the classic and simple modes.
#[derive(Debug, Args)]
struct CommonArgs {
    /// Copy files instead of renaming them
    #[arg(short = 'c', long)]
    copy: bool,
    /// Match (and substitute) case-insensitively
    #[arg(short = 'i', short_alias = 'I', long, conflicts_with = "case_sensitive")]
    case_insensitive: bool,
    /// Match case-sensitively even when the config file says otherwise
    #[arg(long)]
    case_sensitive: bool,
    /// Convert target names to lowercase
    #[arg(short = 'l', long, conflicts_with = "upper")]
    lower: bool,
    /// Convert target names to uppercase
    #[arg(short = 'U', long)]
    upper: bool,
    /// Print nothing, only set the exit status
    #[arg(short = 'q', long)]
    quiet: bool,
    /// Leave entries matching this regular expression out of the batch
    #[arg(short = 'v', long = "except", value_name = "REGEX")]
    except: Option<String>,
    /// Dry run: show what would happen without touching any file
    #[arg(short = 't', long = "test")]
    dry_run: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// Enable debug logging
    #[arg(long)]
    debug: bool,
    /// Read defaults from this file instead of the user configuration
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl CommonArgs {
    fn transform(&self) -> Transform {
        if self.lower {
            Transform::Lower
        } else if self.upper {
            Transform::Upper
        } else {
            Transform::Identity
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "batch-rename-cli", version)]
#[command(about = "Rename or copy the files of the current directory whose names match a regular expression")]
struct ClassicCli {
    /// Regular expression matched against the whole file name
    regex: String,
    /// Target name; `\N` inserts group N, `\(index)` the entry index
    target: String,
    #[arg(long, allow_negative_numbers = true, value_name = "N")]
    index_first: Option<i64>,
    #[arg(long, allow_negative_numbers = true, value_name = "N")]
    index_step: Option<i64>,
    /// Minimum width of the index, or `auto`
    #[arg(long, value_name = "N|auto")]
    index_digits: Option<IndexDigits>,
    #[arg(long, value_name = "CHAR")]
    index_pad_with: Option<char>,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Parser)]
#[command(name = "batch-rename-cli", version)]
#[command(about = "Replace a substring in the names of the files matching a regular expression")]
struct SimpleCli {
    #[arg(short = 's', long = "simple", required = true)]
    simple: bool,
    substring_from: String,
    substring_to: String,
    /// Regular expression matched against the whole file name
    regex: String,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Parser)]
#[command(name = "batch-rename-cli")]
struct SelftestCli {
    /// Run the self-test in a temporary directory under DIR
    #[arg(long, value_name = "DIR", num_args = 0..=1)]
    selftest: Option<Option<PathBuf>>,
    #[arg(long)]
    debug: bool,
    #[arg(short = 'q', long)]
    quiet: bool,
}

#[derive(Debug, Parser)]
#[command(name = "batch-rename-cli")]
struct ShowConfigCli {
    #[arg(long, required = true)]
    show_config: bool,
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Classic,
    Simple,
    Selftest,
    ShowConfig,
}

impl Mode {
    fn detect(args: &[OsString]) -> Self {
        let mut mode = Self::Classic;
        for arg in args.iter().skip(1).filter_map(|a| a.to_str()) {
            if arg == "--" {
                break;
            }
            if arg == "--selftest" || arg.starts_with("--selftest=") {
                return Self::Selftest;
            }
            if arg == "--show-config" {
                return Self::ShowConfig;
            }
            if arg == "--simple" || is_simple_cluster(arg) {
                mode = Self::Simple;
            }
        }
        mode
    }
}

/// `-s` alone or grouped with other boolean short flags, as in `-sci`.
fn is_simple_cluster(arg: &str) -> bool {
    match arg.strip_prefix('-') {
        Some(flags) if !flags.starts_with('-') => {
            flags.contains('s') && flags.chars().all(|c| "sciIlUqt".contains(c))
        }
        _ => false,
    }
}

fn main() -> ExitCode {
    let args: Vec<OsString> = std::env::args_os().collect();

    match Mode::detect(&args) {
        Mode::Selftest => cmd_selftest(SelftestCli::parse_from(&args)),
        Mode::ShowConfig => cmd_show_config(ShowConfigCli::parse_from(&args)),
        Mode::Simple => {
            let cli = SimpleCli::parse_from(&args);
            let options = PlanOptions {
                regex: cli.regex,
                rule: RenameRule::Substring {
                    from: cli.substring_from,
                    to: cli.substring_to,
                },
                except_regex: cli.common.except.clone(),
            };
            cmd_rename(&cli.common, options, IndexOverrides::default())
        }
        Mode::Classic => {
            let cli = ClassicCli::parse_from(&args);
            let options = PlanOptions {
                regex: cli.regex,
                rule: RenameRule::Template(cli.target),
                except_regex: cli.common.except.clone(),
            };
            let overrides = IndexOverrides {
                first: cli.index_first,
                step: cli.index_step,
                digits: cli.index_digits,
                pad: cli.index_pad_with,
            };
            cmd_rename(&cli.common, options, overrides)
        }
    }
}

fn init_logger(debug: bool, quiet: bool) {
    let level = if quiet {
        "off"
    } else if debug {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

#[derive(Debug, Default)]
struct IndexOverrides {
    first: Option<i64>,
    step: Option<i64>,
    digits: Option<IndexDigits>,
    pad: Option<char>,
}

fn read_app_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
}

fn rename_config(app: &AppConfig, common: &CommonArgs, overrides: IndexOverrides) -> RenameConfig {
    let mut index = app.index_sequence();
    if let Some(first) = overrides.first {
        index.first = first;
    }
    if let Some(step) = overrides.step {
        index.step = step;
    }
    if let Some(digits) = overrides.digits {
        index.digits = digits;
    }
    if let Some(pad) = overrides.pad {
        index.pad = pad;
    }

    RenameConfig {
        case_insensitive: !common.case_sensitive
            && (common.case_insensitive || app.case_insensitive),
        transform: common.transform(),
        dry_run: common.dry_run,
        copy: common.copy,
        index,
    }
}

fn cmd_rename(common: &CommonArgs, options: PlanOptions, overrides: IndexOverrides) -> ExitCode {
    init_logger(common.debug, common.quiet);

    match rename(common, &options, overrides) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let status = err
                .downcast_ref::<RenameError>()
                .map_or(2, RenameError::status_code);
            if !common.quiet {
                match err.downcast_ref::<RenameError>() {
                    Some(rename_err) => eprintln!("error: {rename_err}"),
                    None => eprintln!("error: {err:#}"),
                }
            }
            ExitCode::from(status)
        }
    }
}

fn rename(common: &CommonArgs, options: &PlanOptions, overrides: IndexOverrides) -> Result<()> {
    let app = read_app_config(common.config.as_deref())?;
    let config = rename_config(&app, common, overrides);
    log::debug!("effective settings: {config:?}");

    let dir = OsDirectory::current();
    let report = run_batch(&dir, options, &config, |warning| {
        if !common.quiet {
            eprintln!("warning: {warning}");
        }
    })?;

    if common.quiet {
        return Ok(());
    }
    match common.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_table(&report),
    }
    Ok(())
}

fn print_table(report: &BatchReport) {
    let result = &report.result;
    for action in &result.actions {
        match action.kind {
            ActionKind::Unchanged if result.dry_run => eprintln!(
                "note: file {} matches but name doesn't change.",
                action.source
            ),
            ActionKind::Moved if result.dry_run => {
                println!("Would move {} -> {}", action.source, action.target)
            }
            ActionKind::Copied if result.dry_run => println!(
                "Would copy {} -> {} (with permissions and timestamps)",
                action.source, action.target
            ),
            ActionKind::Unchanged | ActionKind::Moved | ActionKind::Copied => {}
        }
    }

    if !result.dry_run && result.applied > 0 {
        let verb = if result
            .actions
            .iter()
            .any(|a| a.kind == ActionKind::Copied)
        {
            "Copied"
        } else {
            "Moved"
        };
        eprintln!(
            "{verb} {} of {} candidate(s) ({} unchanged)",
            result.applied, report.candidates, result.unchanged
        );
    }
}

fn cmd_selftest(cli: SelftestCli) -> ExitCode {
    init_logger(cli.debug, cli.quiet);
    let base = cli.selftest.flatten();

    let report = match selftest::run(base.as_deref()) {
        Ok(report) => report,
        Err(err) => {
            if !cli.quiet {
                eprintln!("error: {err:#}");
            }
            return ExitCode::from(SELFTEST_FIXTURE_FAILURE);
        }
    };

    if !cli.quiet {
        println!(
            "Running {} tests on a {:?} filesystem in {}",
            report.cases.len(),
            report.filesystem,
            report.base.display()
        );
        for case in &report.cases {
            match &case.failure {
                None => println!("Test {} OK.", case.number),
                Some(reason) => println!(
                    "Test {} ({}) FAILED: {reason}",
                    case.number, case.description
                ),
            }
        }
    }

    let failures = report.failures();
    if failures == 0 {
        if !cli.quiet {
            println!("All tests OK.");
        }
        ExitCode::SUCCESS
    } else {
        if !cli.quiet {
            println!("{failures} test(s) failed.");
        }
        ExitCode::from(u8::try_from(failures).unwrap_or(u8::MAX))
    }
}

fn cmd_show_config(cli: ShowConfigCli) -> ExitCode {
    match show_config(cli.config.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn show_config(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => app_paths()?.config_path,
    };
    let config = load_config_from(&path)?;
    println!("config file: {}", path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
