use crate::batch::run_batch;
use crate::config::RenameConfig;
use crate::expander::{RenameRule, Transform};
use crate::fs::{Directory, OsDirectory};
use crate::index::{IndexDigits, IndexSequence};
use crate::planner::PlanOptions;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PREFIXES: [&str; 2] = ["CaSe", "case"];
const LETTERS: &str = "qwertyuiop";
const DIGITS: std::ops::RangeInclusive<u32> = 1..=3;
const FIXTURE_REGEX: &str = r"CaSe(\d[qwertyuiop])";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilesystemKind {
    CaseSensitive,
    CasePreserving,
    CaseInsensitive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseOutcome {
    pub number: usize,
    pub description: String,
    pub failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelftestReport {
    pub base: PathBuf,
    pub filesystem: FilesystemKind,
    pub cases: Vec<CaseOutcome>,
}

impl SelftestReport {
    pub fn failures(&self) -> usize {
        self.cases.iter().filter(|c| c.failure.is_some()).count()
    }
}

#[derive(Debug, Clone)]
enum Expected {
    Files(BTreeSet<String>),
    Status(u8),
}

#[derive(Debug, Clone)]
struct Case {
    description: &'static str,
    options: PlanOptions,
    config: RenameConfig,
    expected: Expected,
}

/// Runs the built-in scenarios against real files in temporary directories
/// created under `base` (the system temp dir when `None`).
pub fn run(base: Option<&Path>) -> Result<SelftestReport> {
    let base = match base {
        Some(path) => path.to_path_buf(),
        None => std::env::temp_dir(),
    };
    let filesystem = detect_filesystem(&base)?;
    let cases = match filesystem {
        FilesystemKind::CaseSensitive => case_sensitive_cases(),
        FilesystemKind::CasePreserving => case_preserving_cases(),
        FilesystemKind::CaseInsensitive => {
            bail!("case-insensitive filesystems without case preservation are not supported")
        }
    };

    let mut outcomes = Vec::with_capacity(cases.len());
    for (idx, case) in cases.iter().enumerate() {
        let failure = run_case(&base, case)?;
        outcomes.push(CaseOutcome {
            number: idx + 1,
            description: case.description.to_string(),
            failure,
        });
    }

    Ok(SelftestReport {
        base,
        filesystem,
        cases: outcomes,
    })
}

fn create_fixtures(base: &Path) -> Result<TempDir> {
    let temp = tempfile::Builder::new()
        .prefix("rename_")
        .suffix(".selftest")
        .tempdir_in(base)
        .with_context(|| format!("could not create a temporary directory in {}", base.display()))?;

    for prefix in PREFIXES {
        for name in each(|d, l| format!("{prefix}{d}{l}")) {
            let path = temp.path().join(&name);
            fs::write(&path, format!("{}\r\n", path.display()))
                .with_context(|| format!("could not create temporary file: {}", path.display()))?;
        }
    }
    Ok(temp)
}

fn detect_filesystem(base: &Path) -> Result<FilesystemKind> {
    let temp = create_fixtures(base)?;
    let names = listing(temp.path())?;
    let per_prefix = DIGITS.count() * LETTERS.len();

    if names.len() == per_prefix * PREFIXES.len() {
        Ok(FilesystemKind::CaseSensitive)
    } else if names.len() == per_prefix {
        if names.iter().all(|n| n.starts_with(PREFIXES[0])) {
            Ok(FilesystemKind::CasePreserving)
        } else {
            Ok(FilesystemKind::CaseInsensitive)
        }
    } else {
        bail!(
            "not all fixture files were created: expected {} or {}, got {}",
            per_prefix * PREFIXES.len(),
            per_prefix,
            names.len()
        )
    }
}

fn listing(path: &Path) -> Result<BTreeSet<String>> {
    let names = OsDirectory::new(path)
        .list_names()
        .with_context(|| format!("could not list {}", path.display()))?;
    Ok(names.into_iter().collect())
}

/// Dry run first, which must leave the directory as it was, then the real
/// run whose status and resulting listing are compared with expectations.
fn run_case(base: &Path, case: &Case) -> Result<Option<String>> {
    let temp = create_fixtures(base)?;
    let dir = OsDirectory::new(temp.path());
    let before = listing(temp.path())?;
    let expected_status = match &case.expected {
        Expected::Files(_) => 0,
        Expected::Status(status) => *status,
    };

    let dry = RenameConfig {
        dry_run: true,
        ..case.config
    };
    let status = status_of(run_batch(&dir, &case.options, &dry, |_| {}).map(|_| ()));
    if status != 0 && status != expected_status {
        return Ok(Some(format!("dry run returned status {status}")));
    }
    if listing(temp.path())? != before {
        return Ok(Some("dry run changed the directory".to_string()));
    }

    let real = RenameConfig {
        dry_run: false,
        ..case.config
    };
    let status = status_of(run_batch(&dir, &case.options, &real, |_| {}).map(|_| ()));
    if status != expected_status {
        return Ok(Some(format!(
            "expected status {expected_status}, got {status}"
        )));
    }

    if let Expected::Files(expected) = &case.expected {
        let actual = listing(temp.path())?;
        if &actual != expected {
            let extra: Vec<_> = actual.difference(expected).cloned().collect();
            let missing: Vec<_> = expected.difference(&actual).cloned().collect();
            return Ok(Some(format!(
                "unexpected listing: extra {extra:?}, missing {missing:?}"
            )));
        }
    }
    Ok(None)
}

fn status_of(result: Result<(), crate::error::RenameError>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            log::debug!("selftest batch failed: {err}");
            err.status_code()
        }
    }
}

fn each(name: impl Fn(u32, char) -> String) -> BTreeSet<String> {
    DIGITS
        .flat_map(|d| LETTERS.chars().map(move |l| (d, l)))
        .map(|(d, l)| name(d, l))
        .collect()
}

fn union(a: BTreeSet<String>, b: BTreeSet<String>) -> BTreeSet<String> {
    a.into_iter().chain(b).collect()
}

fn originals(prefix: &str) -> BTreeSet<String> {
    each(|d, l| format!("{prefix}{d}{l}"))
}

fn doubled_e(l: char) -> String {
    if l == 'e' {
        "ee".to_string()
    } else {
        l.to_string()
    }
}

fn classic(regex: &str, target: &str) -> PlanOptions {
    PlanOptions {
        regex: regex.to_string(),
        rule: RenameRule::Template(target.to_string()),
        except_regex: None,
    }
}

fn simple(from: &str, to: &str) -> PlanOptions {
    PlanOptions {
        regex: FIXTURE_REGEX.to_string(),
        rule: RenameRule::Substring {
            from: from.to_string(),
            to: to.to_string(),
        },
        except_regex: None,
    }
}

fn except(options: PlanOptions, except_regex: &str) -> PlanOptions {
    PlanOptions {
        except_regex: Some(except_regex.to_string()),
        ..options
    }
}

fn config(case_insensitive: bool, transform: Transform) -> RenameConfig {
    RenameConfig {
        case_insensitive,
        transform,
        ..RenameConfig::default()
    }
}

fn indexed(case_insensitive: bool, digits: IndexDigits, copy: bool) -> RenameConfig {
    RenameConfig {
        case_insensitive,
        copy,
        index: IndexSequence {
            first: 100,
            step: 2,
            digits,
            pad: '_',
        },
        ..RenameConfig::default()
    }
}

fn index_names(count: usize, width: usize) -> BTreeSet<String> {
    (0..count)
        .map(|i| format!("C{:_>width$}", 100 + 2 * i))
        .collect()
}

fn case_sensitive_cases() -> Vec<Case> {
    let plain = RenameConfig::default();
    let insensitive = config(true, Transform::Identity);
    let lower_case = originals("case");
    vec![
        Case {
            description: "CaSe -> BrandNew",
            options: classic(FIXTURE_REGEX, r"BrandNew\1"),
            config: plain,
            expected: Expected::Files(union(
                each(|d, l| format!("BrandNew{d}{l}")),
                lower_case.clone(),
            )),
        },
        Case {
            description: "CaSe -> case",
            options: classic(FIXTURE_REGEX, r"case\1"),
            config: plain,
            expected: Expected::Status(1),
        },
        Case {
            description: "CaSe (i) -> case",
            options: classic(FIXTURE_REGEX, r"case\1"),
            config: insensitive,
            expected: Expected::Status(1),
        },
        Case {
            description: "[Cc][Aa][Ss][Ee] -> case",
            options: classic(r"[Cc][Aa][Ss][Ee](\d[qwertyuiop])", r"case\1"),
            config: insensitive,
            expected: Expected::Status(1),
        },
        Case {
            description: "CaSe -> SeCa (except e$)",
            options: except(classic(FIXTURE_REGEX, r"SeCa\1"), "e$"),
            config: plain,
            expected: Expected::Files(union(
                each(|d, l| {
                    if l == 'e' {
                        format!("CaSe{d}e")
                    } else {
                        format!("SeCa{d}{l}")
                    }
                }),
                lower_case.clone(),
            )),
        },
        Case {
            description: "CaSe -> SeCa (U)",
            options: classic(FIXTURE_REGEX, r"SeCa\1"),
            config: config(false, Transform::Upper),
            expected: Expected::Files(union(
                each(|d, l| format!("SECA{d}{}", l.to_ascii_uppercase())),
                lower_case.clone(),
            )),
        },
        Case {
            description: "CaSe (i) -> SeCa (U)",
            options: classic(FIXTURE_REGEX, r"SeCa\1"),
            config: config(true, Transform::Upper),
            expected: Expected::Status(1),
        },
        Case {
            description: "CaSe -> index (auto)",
            options: classic(FIXTURE_REGEX, r"C\(index)"),
            config: insensitive,
            expected: Expected::Files((1..=60).map(|i| format!("C{i:0>2}")).collect()),
        },
        Case {
            description: "CaSe -> index (100, +2, _, auto)",
            options: classic(FIXTURE_REGEX, r"C\(index)"),
            config: indexed(true, IndexDigits::Auto, false),
            expected: Expected::Files(index_names(60, 3)),
        },
        Case {
            description: "CaSe -> index (100, +2, _, 5)",
            options: classic(FIXTURE_REGEX, r"C\(index)"),
            config: indexed(true, IndexDigits::Fixed(5), true),
            expected: Expected::Files(union(
                index_names(60, 5),
                union(originals("CaSe"), lower_case.clone()),
            )),
        },
        Case {
            description: "CaSe -> replace `e` with `ee`",
            options: simple("e", "ee"),
            config: plain,
            expected: Expected::Files(union(
                each(|d, l| format!("CaSee{d}{}", doubled_e(l))),
                lower_case.clone(),
            )),
        },
        Case {
            description: "CaSe (i) -> replace `e` with `ee`",
            options: simple("e", "ee"),
            config: insensitive,
            expected: Expected::Files(union(
                each(|d, l| format!("CaSee{d}{}", doubled_e(l))),
                each(|d, l| format!("casee{d}{}", doubled_e(l))),
            )),
        },
        Case {
            description: "CaSe (i) -> (U) replace `e` with `ee`",
            options: simple("e", "ee"),
            config: config(true, Transform::Upper),
            expected: Expected::Status(1),
        },
        Case {
            description: "CaSe (i) -> replace `e` with `ee` (except e$)",
            options: except(simple("e", "ee"), "e$"),
            config: insensitive,
            expected: Expected::Files(union(
                each(|d, l| {
                    if l == 'e' {
                        format!("CaSe{d}e")
                    } else {
                        format!("CaSee{d}{l}")
                    }
                }),
                each(|d, l| {
                    if l == 'e' {
                        format!("case{d}e")
                    } else {
                        format!("casee{d}{l}")
                    }
                }),
            )),
        },
        Case {
            description: "CaSe -> replace `cAs` with `Fac`",
            options: simple("cAs", "Fac"),
            config: plain,
            expected: Expected::Files(union(originals("CaSe"), lower_case)),
        },
        Case {
            description: "CaSe (i) -> replace `cAs` with `Fac`",
            options: simple("cAs", "Fac"),
            config: insensitive,
            expected: Expected::Status(1),
        },
    ]
}

fn case_preserving_cases() -> Vec<Case> {
    let plain = RenameConfig::default();
    let insensitive = config(true, Transform::Identity);
    vec![
        Case {
            description: "CaSe -> BrandNew",
            options: classic(FIXTURE_REGEX, r"BrandNew\1"),
            config: plain,
            expected: Expected::Files(each(|d, l| format!("BrandNew{d}{l}"))),
        },
        Case {
            description: "CaSe -> case",
            options: classic(FIXTURE_REGEX, r"case\1"),
            config: plain,
            expected: Expected::Files(originals("case")),
        },
        Case {
            description: "CaSe (i) -> CAse",
            options: classic(FIXTURE_REGEX, r"CAse\1"),
            config: insensitive,
            expected: Expected::Files(originals("CAse")),
        },
        Case {
            description: "[Cc][Aa][Ss][Ee] -> caSE",
            options: classic(r"[Cc][Aa][Ss][Ee](\d[qwertyuiop])", r"caSE\1"),
            config: insensitive,
            expected: Expected::Files(originals("caSE")),
        },
        Case {
            description: "CaSe -> SeCa (except e$)",
            options: except(classic(FIXTURE_REGEX, r"SeCa\1"), "e$"),
            config: plain,
            expected: Expected::Files(each(|d, l| {
                if l == 'e' {
                    format!("CaSe{d}e")
                } else {
                    format!("SeCa{d}{l}")
                }
            })),
        },
        Case {
            description: "CaSe -> SeCa (U)",
            options: classic(FIXTURE_REGEX, r"SeCa\1"),
            config: config(false, Transform::Upper),
            expected: Expected::Files(each(|d, l| {
                format!("SECA{d}{}", l.to_ascii_uppercase())
            })),
        },
        Case {
            description: "CaSe (i) -> SeCa (U)",
            options: classic(FIXTURE_REGEX, r"SeCa\1"),
            config: config(true, Transform::Upper),
            expected: Expected::Files(each(|d, l| {
                format!("SECA{d}{}", l.to_ascii_uppercase())
            })),
        },
        Case {
            description: "CaSe -> index (auto)",
            options: classic(FIXTURE_REGEX, r"C\(index)"),
            config: plain,
            expected: Expected::Files((1..=30).map(|i| format!("C{i:0>2}")).collect()),
        },
        Case {
            description: "CaSe -> index (100, +2, _, auto)",
            options: classic(FIXTURE_REGEX, r"C\(index)"),
            config: indexed(false, IndexDigits::Auto, false),
            expected: Expected::Files(index_names(30, 3)),
        },
        Case {
            description: "CaSe -> index (100, +2, _, 5)",
            options: classic(FIXTURE_REGEX, r"C\(index)"),
            config: indexed(false, IndexDigits::Fixed(5), true),
            expected: Expected::Files(union(index_names(30, 5), originals("CaSe"))),
        },
        Case {
            description: "CaSe -> replace `e` with `ee`",
            options: simple("e", "ee"),
            config: plain,
            expected: Expected::Files(each(|d, l| format!("CaSee{d}{}", doubled_e(l)))),
        },
        Case {
            description: "CaSe -> replace `e` with `ee` (except e$)",
            options: except(simple("e", "ee"), "e$"),
            config: plain,
            expected: Expected::Files(each(|d, l| {
                if l == 'e' {
                    format!("CaSe{d}e")
                } else {
                    format!("CaSee{d}{l}")
                }
            })),
        },
        Case {
            description: "CaSe -> replace `cAs` with `Fac`",
            options: simple("cAs", "Fac"),
            config: plain,
            expected: Expected::Files(originals("CaSe")),
        },
        Case {
            description: "CaSe (i) -> replace `cAs` with `Fac`",
            options: simple("cAs", "Fac"),
            config: insensitive,
            expected: Expected::Files(each(|d, l| format!("Face{d}{l}"))),
        },
    ]
}
