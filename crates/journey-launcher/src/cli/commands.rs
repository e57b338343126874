//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::settings::Theme;

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Launch command arguments.
#[derive(Debug, Args)]
pub struct LaunchCommand {
    /// App folder name (case, spaces, dashes and underscores are ignored)
    pub name: String,
}

/// Check command arguments.
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// App folder name
    pub name: String,
}

/// Recent command arguments.
#[derive(Debug, Args)]
pub struct RecentCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Theme command arguments.
#[derive(Debug, Args)]
pub struct ThemeCommand {
    /// Theme to save; prints the current theme when omitted
    #[arg(value_enum)]
    pub theme: Option<ThemeArg>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Theme argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    /// Dark theme
    Dark,
    /// Light theme
    Light,
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Dark => Self::Dark,
            ThemeArg::Light => Self::Light,
        }
    }
}
