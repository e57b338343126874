//! Starting apps.
//!
//! A launch starts the entry script under the interpreter that also ran its
//! pre-flight check, in a detached process with the inherited environment.
//! The launcher does not wait for it and keeps no channel to it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::discovery::{AppState, ResolvedApp};
use crate::error::{Error, Result};
use crate::settings::{recents, SettingsStore};

/// Starts a process running `script` under `interpreter`.
pub trait Spawner: fmt::Debug {
    /// Start the process and return its pid without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the process could not be started.
    fn spawn(&self, interpreter: &Path, script: &Path, cwd: &Path) -> std::io::Result<u32>;
}

/// Spawns a fully detached child: no stdio, own process group.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedSpawner;

impl Spawner for DetachedSpawner {
    fn spawn(&self, interpreter: &Path, script: &Path, cwd: &Path) -> std::io::Result<u32> {
        let mut cmd = Command::new(interpreter);
        cmd.arg(script)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }

        // The child is never waited on
        let child = cmd.spawn()?;
        Ok(child.id())
    }
}

/// A started app process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessHandle {
    /// OS process id.
    pub pid: u32,
    /// Entry script that was started.
    pub script: PathBuf,
    /// When it was started.
    pub launched_at: DateTime<Utc>,
}

/// Launches resolved apps and records when they were launched.
#[derive(Debug)]
pub struct Launcher {
    interpreter: PathBuf,
    spawner: Box<dyn Spawner>,
    max_recents: usize,
}

impl Launcher {
    /// A launcher that starts apps under `interpreter` as detached processes.
    #[must_use]
    pub fn new(interpreter: impl Into<PathBuf>, max_recents: usize) -> Self {
        Self::with_spawner(interpreter, max_recents, Box::new(DetachedSpawner))
    }

    /// A launcher using a custom spawner.
    #[must_use]
    pub fn with_spawner(
        interpreter: impl Into<PathBuf>,
        max_recents: usize,
        spawner: Box<dyn Spawner>,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            spawner,
            max_recents,
        }
    }

    /// Start `app`.
    ///
    /// Invalid apps are rejected before anything is spawned. On success the
    /// launch time is stored under the app's folder name and copied into
    /// `app.last_launched_at`. A failed spawn leaves the app in
    /// [`AppState::LaunchFailed`], still valid, so it can be retried.
    ///
    /// # Errors
    ///
    /// - [`Error::AppInvalid`] if the app failed its pre-flight check.
    /// - [`Error::Spawn`] if the OS could not start the process.
    /// - [`Error::IllegalTransition`] if the app was never validated.
    pub fn launch(
        &self,
        app: &mut ResolvedApp,
        store: &dyn SettingsStore,
    ) -> Result<ProcessHandle> {
        if !app.valid {
            return Err(Error::AppInvalid {
                name: app.name.clone(),
                diagnostic: app
                    .diagnostic
                    .clone()
                    .unwrap_or_else(|| "not checked".to_string()),
            });
        }

        app.transition(AppState::Launching)?;
        let script = app.script().to_path_buf();
        let cwd = script
            .parent()
            .map_or_else(|| app.folder.clone(), Path::to_path_buf);

        match self.spawner.spawn(&self.interpreter, &script, &cwd) {
            Ok(pid) => {
                app.transition(AppState::Valid)?;
                let launched_at = Utc::now();
                if let Err(e) =
                    recents::record_launch(store, &app.name, launched_at, self.max_recents)
                {
                    warn!("Launched {} but could not record it: {}", app.name, e);
                }
                app.last_launched_at = Some(launched_at);
                info!("Launched {} (pid {})", app.name, pid);
                Ok(ProcessHandle {
                    pid,
                    script,
                    launched_at,
                })
            }
            Err(source) => {
                app.transition(AppState::LaunchFailed)?;
                warn!("Could not launch {}: {}", app.name, source);
                Err(Error::Spawn { script, source })
            }
        }
    }
}
