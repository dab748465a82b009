use crate::expander::Transform;
use crate::index::{IndexDigits, IndexSequence};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Defaults read from `config.toml`; command-line flags win over these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub case_insensitive: bool,
    pub index_first: i64,
    pub index_step: i64,
    pub index_digits: IndexDigits,
    pub index_pad_with: char,
}

impl Default for AppConfig {
    fn default() -> Self {
        let index = IndexSequence::default();
        Self {
            case_insensitive: false,
            index_first: index.first,
            index_step: index.step,
            index_digits: index.digits,
            index_pad_with: index.pad,
        }
    }
}

impl AppConfig {
    pub fn index_sequence(&self) -> IndexSequence {
        IndexSequence {
            first: self.index_first,
            step: self.index_step,
            digits: self.index_digits,
            pad: self.index_pad_with,
        }
    }
}

/// Settings of one batch. Fixed for the whole scan, validate and apply run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenameConfig {
    pub case_insensitive: bool,
    pub transform: Transform,
    pub dry_run: bool,
    pub copy: bool,
    pub index: IndexSequence,
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "batch-rename", "batch-rename")
        .context("could not determine the platform configuration directory")?;
    Ok(AppPaths {
        config_path: proj.config_dir().join("config.toml"),
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    load_config_from(&paths.config_path)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read config file: {}", path.display()))?;

    let config = toml::from_str::<AppConfig>(&raw)
        .with_context(|| format!("could not parse config file: {}", path.display()))?;
    Ok(config)
}
