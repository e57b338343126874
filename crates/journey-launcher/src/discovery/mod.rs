//! App discovery.
//!
//! Turns a workspace root into an ordered list of [`ResolvedApp`]s. Every
//! immediate subfolder that is not on the denylist gets at most one entry
//! script, picked by these rules in order:
//!
//! 1. a root script whose stem matches the folder name (see
//!    [`naming::normalize_name`]);
//! 2. a root script named `main`, `app` or `run`, in that order;
//! 3. the only script in the folder root.
//!
//! Only when the folder root holds no scripts at all is the level below
//! searched, and then exactly one script must exist there. Folders with
//! several candidates are skipped rather than guessed at.
//!
//! Filesystem errors never abort a pass: an unreadable folder simply
//! contributes no candidates.

pub mod app;
pub mod naming;

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::settings::{recents, SettingsStore};
use crate::validation::{self, ScriptValidator, ValidationOptions};

pub use app::{AppState, CandidateFolder, EntryCandidate, MatchRank, ResolvedApp};
pub use naming::{normalize_name, Denylist};

/// What to scan and what counts as a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRules {
    /// Folder names to skip.
    pub denylist: Denylist,
    /// Script extension without the dot.
    pub extension: String,
}

impl Default for ScanRules {
    fn default() -> Self {
        Self {
            denylist: Denylist::default(),
            extension: "py".to_string(),
        }
    }
}

impl ScanRules {
    /// Build scan rules from configuration.
    ///
    /// `launcher_folder` is the name of the folder holding the launcher
    /// itself; it is added to the denylist.
    #[must_use]
    pub fn from_config(config: &Config, launcher_folder: Option<&str>) -> Self {
        let extra = config
            .workspace
            .extra_excluded_dirs
            .iter()
            .map(String::as_str)
            .chain(launcher_folder);
        Self {
            denylist: Denylist::new(extra),
            extension: config.runtime.script_extension.trim().to_string(),
        }
    }

    fn is_script(&self, path: &Path) -> bool {
        let has_extension = path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension));
        has_extension
            && path.is_file()
            && !path
                .file_name()
                .is_some_and(|name| naming::is_excluded_file(&name.to_string_lossy()))
    }
}

/// Outcome of looking at a folder root.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RootResolution {
    Found(EntryCandidate),
    NoScripts,
    Ambiguous(usize),
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_dir_sorted(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Skipping unreadable folder {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .collect();
    paths.sort();
    paths
}

/// Eligible scripts directly inside `dir`, sorted by file name.
fn list_scripts(dir: &Path, rules: &ScanRules) -> Vec<PathBuf> {
    read_dir_sorted(dir)
        .into_iter()
        .filter(|p| rules.is_script(p))
        .collect()
}

fn folder_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Immediate subfolders of `root` that are not on the denylist.
#[must_use]
pub fn candidate_folders(root: &Path, rules: &ScanRules) -> Vec<CandidateFolder> {
    read_dir_sorted(root)
        .into_iter()
        .filter(|p| p.is_dir())
        .filter_map(|path| {
            let name = folder_name(&path)?;
            if rules.denylist.contains(&name) {
                debug!("Skipping excluded folder {}", name);
                return None;
            }
            Some(CandidateFolder { name, path })
        })
        .collect()
}

fn resolve_root(folder: &CandidateFolder, rules: &ScanRules) -> RootResolution {
    let scripts = list_scripts(&folder.path, rules);
    if scripts.is_empty() {
        return RootResolution::NoScripts;
    }

    let found = |path: &PathBuf, rank| {
        RootResolution::Found(EntryCandidate {
            path: path.clone(),
            depth: 0,
            rank,
        })
    };

    let folder_key = normalize_name(&folder.name);
    let name_matches: Vec<&PathBuf> = scripts
        .iter()
        .filter(|p| normalize_name(&stem(p)) == folder_key)
        .collect();
    match name_matches.as_slice() {
        [only] => return found(*only, MatchRank::NameMatch),
        [] => {}
        several => debug!(
            "{} scripts in {} match the folder name, trying conventional names",
            several.len(),
            folder.name
        ),
    }

    for (position, conventional) in naming::ENTRY_PRIORITY.iter().enumerate() {
        if let Some(path) = scripts
            .iter()
            .find(|p| stem(p).eq_ignore_ascii_case(conventional))
        {
            if let Some(rank) = MatchRank::conventional(position) {
                return found(path, rank);
            }
        }
    }

    if let [only] = scripts.as_slice() {
        return found(only, MatchRank::SoleScript);
    }

    RootResolution::Ambiguous(scripts.len())
}

fn resolve_nested(folder: &CandidateFolder, rules: &ScanRules) -> Option<EntryCandidate> {
    let mut nested: Vec<PathBuf> = Vec::new();
    for sub in read_dir_sorted(&folder.path) {
        if !sub.is_dir() {
            continue;
        }
        if folder_name(&sub).is_some_and(|name| rules.denylist.contains(&name)) {
            continue;
        }
        nested.extend(list_scripts(&sub, rules));
    }

    if nested.len() == 1 {
        nested.pop().map(|path| EntryCandidate {
            path,
            depth: 1,
            rank: MatchRank::Nested,
        })
    } else {
        if nested.len() > 1 {
            debug!(
                "{} nested scripts under {}, not guessing",
                nested.len(),
                folder.name
            );
        }
        None
    }
}

/// Pick the entry script for one folder, if there is exactly one sensible choice.
#[must_use]
pub fn resolve_entry(folder: &CandidateFolder, rules: &ScanRules) -> Option<EntryCandidate> {
    match resolve_root(folder, rules) {
        RootResolution::Found(entry) => Some(entry),
        RootResolution::Ambiguous(count) => {
            debug!(
                "{} unmatched scripts in {}, skipping folder",
                count, folder.name
            );
            None
        }
        RootResolution::NoScripts => resolve_nested(folder, rules),
    }
}

fn sort_apps(apps: &mut [ResolvedApp]) {
    apps.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Scan the workspace and pick entry scripts, without checking them.
///
/// The result is sorted by display name and every app is in
/// [`AppState::Discovered`].
#[must_use]
pub fn scan(root: &Path, rules: &ScanRules) -> Vec<ResolvedApp> {
    let mut apps: Vec<ResolvedApp> = candidate_folders(root, rules)
        .into_iter()
        .filter_map(|folder| {
            let entry = resolve_entry(&folder, rules)?;
            debug!(
                "Picked {} for {} ({})",
                entry.path.display(),
                folder.name,
                entry.rank
            );
            Some(ResolvedApp::discovered(folder, entry))
        })
        .collect();
    sort_apps(&mut apps);
    apps
}

/// Fill in `last_launched_at` from the settings store.
///
/// A store that cannot be read leaves the timestamps empty.
pub fn attach_recents(apps: &mut [ResolvedApp], store: &dyn SettingsStore) {
    for app in apps {
        match recents::last_launched(store, &app.name) {
            Ok(at) => app.last_launched_at = at,
            Err(e) => warn!("Could not read last launch of {}: {}", app.name, e),
        }
    }
}

/// Run a full discovery pass.
///
/// Scans `root`, checks every chosen entry script with `validator`, attaches
/// last-launched timestamps and returns the apps sorted by name. Invalid apps
/// are kept in the list.
pub async fn discover(
    root: &Path,
    rules: &ScanRules,
    validator: Arc<dyn ScriptValidator>,
    options: &ValidationOptions,
    store: &dyn SettingsStore,
) -> Vec<ResolvedApp> {
    let apps = scan(root, rules);
    let mut apps = validation::validate_all(apps, validator, options).await;
    attach_recents(&mut apps, store);
    sort_apps(&mut apps);

    let invalid = apps.iter().filter(|a| !a.valid).count();
    info!(
        "Discovered {} app(s) in {} ({} invalid)",
        apps.len(),
        root.display(),
        invalid
    );
    apps
}

/// Find an app by folder name, ignoring case and separators.
#[must_use]
pub fn find_app<'a>(apps: &'a [ResolvedApp], name: &str) -> Option<&'a ResolvedApp> {
    app_index(apps, name).map(|i| &apps[i])
}

/// Mutable variant of [`find_app`], for launching.
#[must_use]
pub fn find_app_mut<'a>(apps: &'a mut [ResolvedApp], name: &str) -> Option<&'a mut ResolvedApp> {
    let index = app_index(apps, name)?;
    apps.get_mut(index)
}

fn app_index(apps: &[ResolvedApp], name: &str) -> Option<usize> {
    apps.iter().position(|a| a.name == name).or_else(|| {
        let key = normalize_name(name);
        apps.iter().position(|a| normalize_name(&a.name) == key)
    })
}
