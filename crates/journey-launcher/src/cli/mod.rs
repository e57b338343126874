//! Command-line interface for journey-launcher.
//!
//! This module provides the CLI structure for the `jlaunch` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CheckCommand, ConfigCommand, LaunchCommand, ListCommand, RecentCommand, StatusCommand,
    ThemeArg, ThemeCommand,
};

/// jlaunch - Find and start the script apps in a workspace
///
/// Scans the folders next to the launcher, picks one entry script per folder,
/// checks that it compiles and that its imports resolve, and starts it on request.
#[derive(Debug, Parser)]
#[command(name = "jlaunch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Workspace root to scan instead of the launcher's parent folder
    #[arg(short, long, global = true, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List discovered apps and their check results
    List(ListCommand),

    /// Launch an app by folder name
    Launch(LaunchCommand),

    /// Show the full pre-flight diagnostic for an app
    Check(CheckCommand),

    /// Show when each app was last opened
    Recent(RecentCommand),

    /// Show or set the theme preference
    Theme(ThemeCommand),

    /// Show workspace, interpreter and settings status
    Status(StatusCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli_with(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            workspace: None,
            verbose,
            quiet,
            command: Command::Status(StatusCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "jlaunch");
    }

    #[test]
    fn test_verbosity_quiet() {
        assert_eq!(cli_with(0, true).verbosity(), crate::logging::Verbosity::Quiet);
        assert_eq!(cli_with(2, true).verbosity(), crate::logging::Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(cli_with(0, false).verbosity(), crate::logging::Verbosity::Normal);
        assert_eq!(cli_with(1, false).verbosity(), crate::logging::Verbosity::Verbose);
        assert_eq!(cli_with(3, false).verbosity(), crate::logging::Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list_json() {
        let cli = Cli::try_parse_from(["jlaunch", "list", "--json"]).unwrap();
        assert!(matches!(cli.command, Command::List(ListCommand { json: true })));
    }

    #[test]
    fn test_parse_launch() {
        let cli = Cli::try_parse_from(["jlaunch", "launch", "Journey Tracker"]).unwrap();
        match cli.command {
            Command::Launch(cmd) => assert_eq!(cmd.name, "Journey Tracker"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_launch_requires_name() {
        assert!(Cli::try_parse_from(["jlaunch", "launch"]).is_err());
    }

    #[test]
    fn test_parse_theme() {
        let cli = Cli::try_parse_from(["jlaunch", "theme", "light"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Theme(ThemeCommand {
                theme: Some(ThemeArg::Light)
            })
        ));

        let cli = Cli::try_parse_from(["jlaunch", "theme"]).unwrap();
        assert!(matches!(cli.command, Command::Theme(ThemeCommand { theme: None })));

        assert!(Cli::try_parse_from(["jlaunch", "theme", "solarized"]).is_err());
    }

    #[test]
    fn test_parse_config_validate() {
        let cli =
            Cli::try_parse_from(["jlaunch", "config", "validate", "--file", "/tmp/c.toml"]).unwrap();
        match cli.command {
            Command::Config(ConfigCommand::Validate { file }) => {
                assert_eq!(file, Some(PathBuf::from("/tmp/c.toml")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "jlaunch",
            "-c",
            "/custom/config.toml",
            "-w",
            "/apps",
            "-v",
            "recent",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert_eq!(cli.workspace, Some(PathBuf::from("/apps")));
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Command::Recent(_)));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["jlaunch", "list", "-q", "--workspace", "/apps"]).unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.workspace, Some(PathBuf::from("/apps")));
    }
}
