//! Data model for discovered apps.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An immediate subdirectory of the workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFolder {
    /// Folder name, also the app's display name.
    pub name: String,
    /// Full path to the folder.
    pub path: PathBuf,
}

/// Which rule picked an entry script. Lower ranks win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRank {
    /// Script stem equals the folder name after normalization.
    NameMatch,
    /// Script stem is `main`.
    Main,
    /// Script stem is `app`.
    App,
    /// Script stem is `run`.
    Run,
    /// The only script in the folder root.
    SoleScript,
    /// The only script one level below the folder root.
    Nested,
}

impl MatchRank {
    /// Numeric rank, 0 being the strongest match.
    #[must_use]
    pub fn value(self) -> u8 {
        match self {
            Self::NameMatch => 0,
            Self::Main => 1,
            Self::App => 2,
            Self::Run => 3,
            Self::SoleScript => 4,
            Self::Nested => 5,
        }
    }

    /// Rank for a position in the conventional entry-name list.
    #[must_use]
    pub fn conventional(position: usize) -> Option<Self> {
        match position {
            0 => Some(Self::Main),
            1 => Some(Self::App),
            2 => Some(Self::Run),
            _ => None,
        }
    }
}

impl fmt::Display for MatchRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameMatch => write!(f, "name match"),
            Self::Main => write!(f, "main"),
            Self::App => write!(f, "app"),
            Self::Run => write!(f, "run"),
            Self::SoleScript => write!(f, "sole script"),
            Self::Nested => write!(f, "nested"),
        }
    }
}

/// A script chosen as the launch target of a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryCandidate {
    /// Path to the script.
    pub path: PathBuf,
    /// 0 for the folder root, 1 for one level below.
    pub depth: u8,
    /// Rule that picked it.
    pub rank: MatchRank,
}

/// Lifecycle of a resolved app within one discovery pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    /// Entry script chosen, not yet checked.
    Discovered,
    /// Pre-flight check running.
    Validating,
    /// Passed the pre-flight check.
    Valid,
    /// Failed the pre-flight check; launching is disabled.
    Invalid,
    /// Process being started.
    Launching,
    /// The last launch attempt failed; a retry is allowed.
    LaunchFailed,
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovered => write!(f, "discovered"),
            Self::Validating => write!(f, "validating"),
            Self::Valid => write!(f, "valid"),
            Self::Invalid => write!(f, "invalid"),
            Self::Launching => write!(f, "launching"),
            Self::LaunchFailed => write!(f, "launch failed"),
        }
    }
}

impl AppState {
    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Discovered, Self::Validating)
                | (Self::Validating, Self::Valid | Self::Invalid)
                | (Self::Valid | Self::LaunchFailed, Self::Launching)
                | (Self::Launching, Self::Valid | Self::LaunchFailed)
        )
    }
}

/// A launchable app: one folder, one entry script, one check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedApp {
    /// Folder name.
    pub name: String,
    /// Folder path.
    pub folder: PathBuf,
    /// Chosen entry script.
    pub entry: EntryCandidate,
    /// Result of the pre-flight check.
    pub valid: bool,
    /// Compiler or import error text when the check failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    /// When the user last launched this app.
    pub last_launched_at: Option<DateTime<Utc>>,
    /// Lifecycle state.
    pub state: AppState,
}

impl ResolvedApp {
    /// Create a freshly discovered app. It starts out not valid until checked.
    #[must_use]
    pub fn discovered(folder: CandidateFolder, entry: EntryCandidate) -> Self {
        Self {
            name: folder.name,
            folder: folder.path,
            entry,
            valid: false,
            diagnostic: None,
            last_launched_at: None,
            state: AppState::Discovered,
        }
    }

    /// Path to the entry script.
    #[must_use]
    pub fn script(&self) -> &Path {
        &self.entry.path
    }

    /// Entry script relative to the app folder, for display.
    #[must_use]
    pub fn relative_script(&self) -> &Path {
        self.entry
            .path
            .strip_prefix(&self.folder)
            .unwrap_or(&self.entry.path)
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalTransition`] for a disallowed transition.
    pub fn transition(&mut self, next: AppState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Record the pre-flight result and settle on `Valid` or `Invalid`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalTransition`] if the app is not being validated.
    pub fn finish_validation(&mut self, diagnostic: Option<String>) -> Result<()> {
        let next = if diagnostic.is_none() {
            AppState::Valid
        } else {
            AppState::Invalid
        };
        self.transition(next)?;
        self.valid = diagnostic.is_none();
        self.diagnostic = diagnostic;
        Ok(())
    }
}
