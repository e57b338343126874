//! Locating the workspace and the script interpreter.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

/// The workspace being scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Directory whose subfolders are scanned.
    pub root: PathBuf,
    /// Name of the folder holding the launcher, when that folder sits in `root`.
    pub launcher_folder: Option<String>,
}

impl Workspace {
    /// Locate the workspace.
    ///
    /// Precedence: `override_root` (the `--workspace` flag), then
    /// `workspace.root` from config, then the parent of the folder that
    /// contains the running launcher binary.
    ///
    /// # Errors
    ///
    /// Returns an error if no override is given and the launcher's own
    /// location cannot be determined.
    pub fn locate(override_root: Option<PathBuf>, config: &Config) -> Result<Self> {
        let launcher_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        let root = match override_root.or_else(|| config.workspace.root.clone()) {
            Some(root) => root,
            None => {
                let dir = launcher_dir.clone().ok_or_else(|| {
                    Error::internal("cannot determine the launcher's own folder")
                })?;
                dir.parent().map_or_else(|| dir.clone(), Path::to_path_buf)
            }
        };

        Ok(Self::with_launcher_dir(root, launcher_dir.as_deref()))
    }

    /// Build a workspace for `root`, excluding `launcher_dir` if it lives directly in it.
    #[must_use]
    pub fn with_launcher_dir(root: PathBuf, launcher_dir: Option<&Path>) -> Self {
        let canonical_root = std::fs::canonicalize(&root).unwrap_or_else(|_| root.clone());
        let launcher_folder = launcher_dir.and_then(|dir| {
            let dir = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
            if dir.parent() == Some(canonical_root.as_path()) {
                dir.file_name().map(|n| n.to_string_lossy().into_owned())
            } else {
                None
            }
        });
        debug!(
            "Workspace root {} (launcher folder: {:?})",
            root.display(),
            launcher_folder
        );
        Self {
            root,
            launcher_folder,
        }
    }
}

/// Resolve the configured interpreter to an executable path.
///
/// The same path is used for pre-flight checks and for launches.
///
/// # Errors
///
/// Returns [`Error::InterpreterNotFound`] if it is not on `PATH` or does not exist.
pub fn resolve_interpreter(name: &str) -> Result<PathBuf> {
    let path = which::which(name).map_err(|source| Error::InterpreterNotFound {
        name: name.to_string(),
        source,
    })?;
    debug!("Using interpreter {}", path.display());
    Ok(path)
}
