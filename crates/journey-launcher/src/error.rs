//! Error types for journey-launcher.
//!
//! Discovery-level and resolution-level conditions (unreadable folders, no
//! entry script) are never errors; they are logged and skipped. What remains
//! here are the conditions a caller has to report to the user.

use std::path::PathBuf;
use thiserror::Error;

use crate::discovery::AppState;

/// The main error type for journey-launcher operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Settings Errors ===
    /// Failed to open or create the settings database.
    #[error("failed to open settings database at {path}: {source}")]
    SettingsOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A settings query failed.
    #[error("settings query failed: {0}")]
    SettingsQuery(#[from] rusqlite::Error),

    /// Failed to run settings schema migrations.
    #[error("settings migration failed: {message}")]
    SettingsMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === App Errors ===
    /// No discovered app matches the requested name.
    #[error("no app named '{name}' in the workspace")]
    AppNotFound {
        /// The name that was looked up.
        name: String,
    },

    /// The app failed its pre-flight check and cannot be launched.
    #[error("'{name}' failed its pre-flight check: {diagnostic}")]
    AppInvalid {
        /// Folder name of the app.
        name: String,
        /// Compiler or import error text.
        diagnostic: String,
    },

    /// An app was moved through its lifecycle in an order that is not allowed.
    #[error("illegal app state transition from {from} to {to}")]
    IllegalTransition {
        /// State the app was in.
        from: AppState,
        /// State that was requested.
        to: AppState,
    },

    // === Runtime Errors ===
    /// The configured script interpreter could not be found.
    #[error("script interpreter '{name}' not found: {source}")]
    InterpreterNotFound {
        /// The configured interpreter name or path.
        name: String,
        /// The underlying lookup error.
        #[source]
        source: which::Error,
    },

    /// The OS refused to start the app process.
    #[error("failed to start {script}: {source}")]
    Spawn {
        /// The entry script that was being launched.
        script: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for journey-launcher operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an app-not-found error.
    #[must_use]
    pub fn app_not_found(name: impl Into<String>) -> Self {
        Self::AppNotFound { name: name.into() }
    }

    /// Check if this error rejected a launch because the app is invalid.
    #[must_use]
    pub fn is_app_invalid(&self) -> bool {
        matches!(self, Self::AppInvalid { .. })
    }

    /// Check if this error happened while starting the process.
    ///
    /// These are transient: the user may retry the launch.
    #[must_use]
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, Self::Spawn { .. } | Self::InterpreterNotFound { .. })
    }
}
