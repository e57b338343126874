//! `journey-launcher` - Discovers and launches the script apps in a workspace
//!
//! Every immediate subfolder of the workspace root is a candidate app. One
//! entry script is chosen per folder, checked ahead of time so broken apps
//! can be shown as such, and started as a detached process on request.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod humanize;
pub mod launch;
pub mod logging;
pub mod runtime;
pub mod settings;
pub mod validation;

pub use config::Config;
pub use discovery::{discover, find_app, AppState, MatchRank, ResolvedApp, ScanRules};
pub use error::{Error, Result};
pub use launch::{Launcher, ProcessHandle};
pub use logging::init_logging;
pub use runtime::Workspace;
pub use settings::{Settings, SettingsStore, Theme};
pub use validation::{NoCheck, PythonCheck, ScriptValidator, Validation, ValidationOptions};
