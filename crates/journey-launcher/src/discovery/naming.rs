//! Name matching shared by every discovery rule.

/// Folder names never scanned for apps, compared case-insensitively.
pub const EXCLUDED_DIRS: &[&str] = &[
    "launcher",
    ".git",
    "__pycache__",
    "build",
    "dist",
    "storage",
    "assets",
    ".venv",
    "venv",
];

/// Script file names that are never entry points, compared case-insensitively.
pub const EXCLUDED_FILES: &[&str] = &["__init__.py", "setup.py", "conftest.py"];

/// Conventional entry stems, in priority order.
pub const ENTRY_PRIORITY: &[&str] = &["main", "app", "run"];

/// Normalize an app or script name for matching.
///
/// Spaces, underscores and hyphens are removed and the rest is lower-cased,
/// so `"My App"`, `"my_app"` and `"My-App"` all become `"myapp"`.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn denylist_key(name: &str) -> String {
    name.trim_end_matches(['/', '\\']).to_lowercase()
}

/// The folder denylist: built-in names plus caller-supplied extras.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denylist {
    names: Vec<String>,
}

impl Default for Denylist {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

impl Denylist {
    /// Build a denylist from the built-in names and `extra`.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = EXCLUDED_DIRS.iter().map(|n| denylist_key(n)).collect();
        for name in extra {
            let key = denylist_key(name.as_ref());
            if !key.is_empty() && !names.contains(&key) {
                names.push(key);
            }
        }
        Self { names }
    }

    /// Whether a folder with this name is skipped.
    ///
    /// Exact match after lower-casing and trimming trailing path separators;
    /// no substring or glob matching.
    #[must_use]
    pub fn contains(&self, folder_name: &str) -> bool {
        let key = denylist_key(folder_name);
        self.names.iter().any(|n| *n == key)
    }
}

/// Whether a file name is on the excluded-file list.
#[must_use]
pub fn is_excluded_file(file_name: &str) -> bool {
    let lowered = file_name.to_lowercase();
    EXCLUDED_FILES.iter().any(|f| *f == lowered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_separators_and_case() {
        assert_eq!(normalize_name("My App"), "myapp");
        assert_eq!(normalize_name("my_app"), "myapp");
        assert_eq!(normalize_name("My-App"), "myapp");
        assert_eq!(normalize_name("Cycle Tracker"), normalize_name("cycle_tracker"));
    }

    #[test]
    fn test_normalize_keeps_other_characters() {
        assert_eq!(normalize_name("C-T"), "ct");
        assert_eq!(normalize_name("r.m"), "r.m");
        assert_eq!(normalize_name("Ärzte"), "ärzte");
    }

    #[test]
    fn test_denylist_builtin() {
        let deny = Denylist::default();
        for name in EXCLUDED_DIRS {
            assert!(deny.contains(name), "{name} should be excluded");
        }
        assert!(deny.contains("Launcher"));
        assert!(deny.contains("VENV"));
        assert!(deny.contains(".Git"));
        assert!(deny.contains("build/"));
    }

    #[test]
    fn test_denylist_is_exact() {
        let deny = Denylist::default();
        assert!(!deny.contains("my_launcher"));
        assert!(!deny.contains("builder"));
        assert!(!deny.contains("venv2"));
        assert!(!deny.contains("Journey"));
    }

    #[test]
    fn test_denylist_extra() {
        let deny = Denylist::new(["Scratch", "", "build"]);
        assert!(deny.contains("scratch"));
        assert!(deny.contains("build"));
        assert!(!deny.contains(""));
    }

    #[test]
    fn test_excluded_files() {
        assert!(is_excluded_file("__init__.py"));
        assert!(is_excluded_file("Setup.py"));
        assert!(!is_excluded_file("main.py"));
    }
}
