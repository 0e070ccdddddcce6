// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, Result};

const DEFAULT_ROOT: &str = "/";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_BTRFS: &str = "btrfs";
const DEFAULT_FINDMNT: &str = "findmnt";

/// Btrfs snapshot daemon speaking line-delimited JSON on stdin/stdout
#[derive(Parser, Debug, Default)]
#[command(name = "butterd", version)]
#[command(about = "Btrfs snapshot daemon speaking line-delimited JSON on stdin/stdout", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Mount point whose filesystem is inspected
    #[arg(long, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// btrfs program
    #[arg(long, value_name = "PROG")]
    pub btrfs: Option<PathBuf>,

    /// findmnt program
    #[arg(long, value_name = "PROG")]
    pub findmnt: Option<PathBuf>,
}

/// Contents of the optional configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub root: Option<PathBuf>,
    pub log_level: Option<String>,
    pub btrfs: Option<PathBuf>,
    pub findmnt: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            DaemonError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&raw).map_err(|e| match e {
            DaemonError::Config(reason) => {
                DaemonError::Config(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| DaemonError::Config(e.to_string()))
    }
}

/// Effective settings: command line over file over defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub root: PathBuf,
    pub log_level: String,
    pub btrfs: PathBuf,
    pub findmnt: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self::merge(&Cli::default(), FileConfig::default())
    }
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::merge(cli, file))
    }

    pub fn merge(cli: &Cli, file: FileConfig) -> Self {
        Self {
            root: cli
                .root
                .clone()
                .or(file.root)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT)),
            log_level: cli
                .log_level
                .clone()
                .or(file.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            btrfs: cli
                .btrfs
                .clone()
                .or(file.btrfs)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BTRFS)),
            findmnt: cli
                .findmnt
                .clone()
                .or(file.findmnt)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FINDMNT)),
        }
    }
}
