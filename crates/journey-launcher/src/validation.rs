//! Pre-flight checks for entry scripts.
//!
//! Before an app is offered for launch its entry script is compiled (without
//! running it) and its top-level imports are resolved (without importing
//! them). Both steps run in short-lived interpreter processes. A check that
//! fails, cannot run, or exceeds its timeout marks the app invalid; it never
//! removes the app from the list.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::Config;
use crate::discovery::{AppState, ResolvedApp};
use crate::error::Result;

/// Compiles the file named by `argv[1]` without executing it or writing bytecode.
const COMPILE_SNIPPET: &str = "\
import sys
with open(sys.argv[1], 'rb') as f:
    source = f.read()
compile(source, sys.argv[1], 'exec')
";

/// Prints the modules that cannot be found from the script's folder, without
/// importing them.
///
/// `argv[1]` is the script's folder, `argv[2]` the script, `argv[3]` is `1` to
/// include the script's own top-level imports, and `argv[4:]` are extra
/// module names. Imports are read from the parsed module body, so text in
/// strings and imports nested in functions or `try` blocks are not counted.
/// Relative imports are skipped.
const FIND_SPEC_SNIPPET: &str = "\
import ast, importlib.util, sys
sys.path.insert(0, sys.argv[1])
names = [n.split('.')[0] for n in sys.argv[4:]]
if sys.argv[3] == '1':
    with open(sys.argv[2], 'rb') as f:
        tree = ast.parse(f.read(), sys.argv[2])
    for node in tree.body:
        if isinstance(node, ast.Import):
            names.extend(a.name.split('.')[0] for a in node.names)
        elif isinstance(node, ast.ImportFrom) and node.level == 0 and node.module:
            names.append(node.module.split('.')[0])
missing = []
for name in dict.fromkeys(names):
    try:
        found = importlib.util.find_spec(name) is not None
    except (ImportError, ValueError):
        found = False
    if not found:
        missing.append(name)
print(' '.join(missing))
sys.exit(1 if missing else 0)
";

/// Result of a pre-flight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// The script compiles and its imports resolve.
    Valid,
    /// The script cannot be launched.
    Invalid {
        /// Text to show the user.
        diagnostic: String,
    },
}

impl Validation {
    /// Create an invalid result.
    #[must_use]
    pub fn invalid(diagnostic: impl Into<String>) -> Self {
        Self::Invalid {
            diagnostic: diagnostic.into(),
        }
    }

    /// The diagnostic text, `None` when valid.
    #[must_use]
    pub fn into_diagnostic(self) -> Option<String> {
        match self {
            Self::Valid => None,
            Self::Invalid { diagnostic } => Some(diagnostic),
        }
    }
}

/// Checks whether an entry script can be launched.
#[async_trait]
pub trait ScriptValidator: Send + Sync {
    /// Check one script.
    ///
    /// # Errors
    ///
    /// Returns an error only when the check itself could not be carried out;
    /// a script that fails the check yields `Ok(Validation::Invalid { .. })`.
    async fn check(&self, script: &Path) -> Result<Validation>;
}

/// How a batch of checks is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Time allowed for a single check.
    pub timeout: Duration,
    /// Checks running at once.
    pub max_parallel: usize,
}

impl ValidationOptions {
    /// Options from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.validation_timeout(),
            max_parallel: config.validation.max_parallel,
        }
    }
}

/// Validator used when checks are turned off: every script passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCheck;

#[async_trait]
impl ScriptValidator for NoCheck {
    async fn check(&self, _script: &Path) -> Result<Validation> {
        Ok(Validation::Valid)
    }
}

/// Validator used when no interpreter could be found: every script fails with `reason`.
#[derive(Debug, Clone)]
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    /// Fail every check with `reason`.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ScriptValidator for Unavailable {
    async fn check(&self, _script: &Path) -> Result<Validation> {
        Ok(Validation::invalid(self.reason.clone()))
    }
}

/// Compile and import check using a Python interpreter.
#[derive(Debug, Clone)]
pub struct PythonCheck {
    interpreter: PathBuf,
    check_imports: bool,
    required_modules: Vec<String>,
}

impl PythonCheck {
    /// A compile-only check run by `interpreter`.
    #[must_use]
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            check_imports: false,
            required_modules: Vec::new(),
        }
    }

    /// Also verify the script's top-level imports.
    #[must_use]
    pub fn with_import_check(mut self, enabled: bool) -> Self {
        self.check_imports = enabled;
        self
    }

    /// Modules that must resolve for every script.
    #[must_use]
    pub fn with_required_modules(mut self, modules: Vec<String>) -> Self {
        self.required_modules = modules;
        self
    }

    /// Check configured from the `[validation]` section.
    #[must_use]
    pub fn from_config(interpreter: impl Into<PathBuf>, config: &Config) -> Self {
        Self::new(interpreter)
            .with_import_check(config.validation.check_imports)
            .with_required_modules(config.validation.required_modules.clone())
    }

    fn command(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.current_dir(dir)
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// Top-level packages of `required_modules`, first appearance kept.
    fn required_roots(&self) -> Vec<String> {
        let mut roots: Vec<String> = Vec::new();
        for module in &self.required_modules {
            let root = top_level(module);
            if !roots.iter().any(|r| r == root) {
                roots.push(root.to_string());
            }
        }
        roots
    }
}

#[async_trait]
impl ScriptValidator for PythonCheck {
    async fn check(&self, script: &Path) -> Result<Validation> {
        if !script.is_file() {
            return Ok(Validation::invalid(format!(
                "Could not find:\n{}",
                script.display()
            )));
        }
        let dir = script.parent().unwrap_or_else(|| Path::new("."));

        debug!("Compiling {}", script.display());
        let output = self
            .command(dir)
            .arg("-c")
            .arg(COMPILE_SNIPPET)
            .arg(script)
            .output()
            .await?;
        if !output.status.success() {
            return Ok(Validation::invalid(format!(
                "The script could not be compiled (syntax error).\n\n{}",
                detail(&output)
            )));
        }

        let required = self.required_roots();
        if !self.check_imports && required.is_empty() {
            return Ok(Validation::Valid);
        }

        debug!(
            "Resolving imports of {} (required: {:?})",
            script.display(),
            required
        );
        let output = self
            .command(dir)
            .arg("-c")
            .arg(FIND_SPEC_SNIPPET)
            .arg(dir)
            .arg(script)
            .arg(if self.check_imports { "1" } else { "0" })
            .args(&required)
            .output()
            .await?;
        if output.status.success() {
            return Ok(Validation::Valid);
        }

        let missing = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if missing.is_empty() {
            return Ok(Validation::invalid(format!(
                "Could not check imports.\n\n{}",
                detail(&output)
            )));
        }
        Ok(Validation::invalid(format!(
            "Missing module(s): {}\n\nInstall with:\n{} -m pip install {}",
            missing.replace(' ', ", "),
            self.interpreter.display(),
            missing
        )))
    }
}

fn detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };
    if text.is_empty() {
        "(no details)".to_string()
    } else {
        text.to_string()
    }
}

fn top_level(module: &str) -> &str {
    module.split('.').next().unwrap_or(module)
}

fn module_name_regex() -> &'static Regex {
    static MODULE_RE: OnceLock<Regex> = OnceLock::new();
    MODULE_RE.get_or_init(|| {
        Regex::new(r"^[\p{L}_][\p{L}\p{N}_]*(?:\.[\p{L}_][\p{L}\p{N}_]*)*$")
            .expect("module name pattern is valid")
    })
}

/// Whether `name` is a plain or dotted Python module name.
#[must_use]
pub fn is_module_name(name: &str) -> bool {
    module_name_regex().is_match(name)
}

/// Check every app, at most `options.max_parallel` at a time.
///
/// Apps come back in the order given, each in `Valid` or `Invalid`.
pub async fn validate_all(
    mut apps: Vec<ResolvedApp>,
    validator: Arc<dyn ScriptValidator>,
    options: &ValidationOptions,
) -> Vec<ResolvedApp> {
    let semaphore = Arc::new(Semaphore::new(options.max_parallel.max(1)));
    let timeout = options.timeout;
    let mut tasks = JoinSet::new();

    for (index, app) in apps.iter_mut().enumerate() {
        if let Err(e) = app.transition(AppState::Validating) {
            warn!("Not checking {}: {}", app.name, e);
            continue;
        }
        let script = app.script().to_path_buf();
        let validator = Arc::clone(&validator);
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            // The semaphore is never closed, so acquiring cannot fail
            let _permit = semaphore.acquire_owned().await.ok();
            let outcome = match tokio::time::timeout(timeout, validator.check(&script)).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    Validation::invalid(format!("Could not run the pre-flight check.\n\n{e}"))
                }
                Err(_) => Validation::invalid(format!(
                    "The pre-flight check did not finish within {timeout:?}."
                )),
            };
            (index, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => settle(&mut apps[index], outcome),
            Err(e) => warn!("Pre-flight task failed: {}", e),
        }
    }

    // Anything still validating lost its task
    for app in apps.iter_mut().filter(|a| a.state == AppState::Validating) {
        settle(app, Validation::invalid("The pre-flight check did not complete."));
    }

    apps
}

fn settle(app: &mut ResolvedApp, outcome: Validation) {
    if let Validation::Invalid { diagnostic } = &outcome {
        debug!("{} failed its pre-flight check: {}", app.name, diagnostic);
    }
    if let Err(e) = app.finish_validation(outcome.into_diagnostic()) {
        warn!("Could not record check result for {}: {}", app.name, e);
    }
}

/// Validators for tests that do not need an interpreter.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Marks scripts containing `SYNTAX ERROR` invalid, quoting that line.
    #[derive(Debug)]
    pub(crate) struct MarkerValidator;

    #[async_trait]
    impl ScriptValidator for MarkerValidator {
        async fn check(&self, script: &Path) -> Result<Validation> {
            let source = tokio::fs::read_to_string(script).await?;
            Ok(source
                .lines()
                .find(|l| l.contains("SYNTAX ERROR"))
                .map_or(Validation::Valid, |line| {
                    Validation::invalid(format!("SyntaxError: {}", line.trim()))
                }))
        }
    }

    /// Never finishes in time.
    #[derive(Debug)]
    pub(crate) struct HangingValidator;

    #[async_trait]
    impl ScriptValidator for HangingValidator {
        async fn check(&self, _script: &Path) -> Result<Validation> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Validation::Valid)
        }
    }

    /// Cannot run at all.
    #[derive(Debug)]
    pub(crate) struct BrokenValidator;

    #[async_trait]
    impl ScriptValidator for BrokenValidator {
        async fn check(&self, _script: &Path) -> Result<Validation> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "interpreter missing").into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{BrokenValidator, HangingValidator, MarkerValidator};
    use super::*;
    use crate::discovery::{CandidateFolder, EntryCandidate, MatchRank};

    fn app_for(dir: &Path, name: &str, contents: &str) -> ResolvedApp {
        let folder = dir.join(name);
        std::fs::create_dir_all(&folder).unwrap();
        let script = folder.join("main.py");
        std::fs::write(&script, contents).unwrap();
        ResolvedApp::discovered(
            CandidateFolder {
                name: name.to_string(),
                path: folder,
            },
            EntryCandidate {
                path: script,
                depth: 0,
                rank: MatchRank::Main,
            },
        )
    }

    fn options(timeout: Duration) -> ValidationOptions {
        ValidationOptions {
            timeout,
            max_parallel: 2,
        }
    }

    #[test]
    fn test_is_module_name() {
        assert!(is_module_name("PySide6"));
        assert!(is_module_name("PySide6.QtCore"));
        assert!(is_module_name("_private"));
        assert!(!is_module_name(""));
        assert!(!is_module_name("6six"));
        assert!(!is_module_name("two words"));
        assert!(!is_module_name("trailing."));
        assert!(!is_module_name("a..b"));
        assert!(!is_module_name("pkg-name"));
        assert!(is_module_name("données"));
    }

    #[test]
    fn test_required_roots_dedup() {
        let check = PythonCheck::new("python3").with_required_modules(vec![
            "PySide6.QtWidgets".to_string(),
            "PySide6.QtCore".to_string(),
            "requests".to_string(),
        ]);
        assert_eq!(check.required_roots(), vec!["PySide6", "requests"]);
        assert!(PythonCheck::new("python3").required_roots().is_empty());
    }

    #[test]
    fn test_validation_into_diagnostic() {
        assert_eq!(Validation::Valid.into_diagnostic(), None);
        assert_eq!(
            Validation::invalid("boom").into_diagnostic(),
            Some("boom".to_string())
        );
    }

    #[tokio::test]
    async fn test_validate_all_keeps_order_and_settles() {
        let dir = tempfile::tempdir().unwrap();
        let apps = vec![
            app_for(dir.path(), "A", "print('a')\n"),
            app_for(dir.path(), "B", "SYNTAX ERROR here\n"),
            app_for(dir.path(), "C", "print('c')\n"),
        ];

        let apps = validate_all(apps, Arc::new(MarkerValidator), &options(Duration::from_secs(5))).await;

        let names: Vec<&str> = apps.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(apps[0].state, AppState::Valid);
        assert_eq!(apps[1].state, AppState::Invalid);
        assert!(apps[1].diagnostic.as_deref().unwrap().starts_with("SyntaxError"));
        assert_eq!(apps[2].state, AppState::Valid);
    }

    #[tokio::test]
    async fn test_validate_all_timeout_marks_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let apps = vec![app_for(dir.path(), "Slow", "print('zzz')\n")];

        let apps = validate_all(
            apps,
            Arc::new(HangingValidator),
            &options(Duration::from_millis(50)),
        )
        .await;

        assert!(!apps[0].valid);
        assert_eq!(apps[0].state, AppState::Invalid);
        assert!(apps[0].diagnostic.as_deref().unwrap().contains("did not finish"));
    }

    #[tokio::test]
    async fn test_validate_all_check_error_marks_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let apps = vec![app_for(dir.path(), "X", "print('x')\n")];

        let apps = validate_all(apps, Arc::new(BrokenValidator), &options(Duration::from_secs(5))).await;

        assert!(!apps[0].valid);
        assert!(apps[0]
            .diagnostic
            .as_deref()
            .unwrap()
            .contains("interpreter missing"));
    }

    #[tokio::test]
    async fn test_no_check_passes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let apps = vec![app_for(dir.path(), "Any", "SYNTAX ERROR\n")];

        let apps = validate_all(apps, Arc::new(NoCheck), &options(Duration::from_secs(1))).await;
        assert!(apps[0].valid);
    }

    #[tokio::test]
    async fn test_unavailable_fails_everything_with_reason() {
        let dir = tempfile::tempdir().unwrap();
        let apps = vec![app_for(dir.path(), "Any", "print('ok')\n")];
        let validator = Arc::new(Unavailable::new("Interpreter 'python3' not found"));

        let apps = validate_all(apps, validator, &options(Duration::from_secs(1))).await;
        assert!(!apps[0].valid);
        assert_eq!(apps[0].state, AppState::Invalid);
        assert_eq!(
            apps[0].diagnostic.as_deref(),
            Some("Interpreter 'python3' not found")
        );
    }

    #[tokio::test]
    async fn test_python_check_missing_file() {
        let check = PythonCheck::new("python3");
        let outcome = check.check(Path::new("/nonexistent/app/main.py")).await.unwrap();
        assert!(matches!(outcome, Validation::Invalid { .. }));
    }

    #[tokio::test]
    async fn test_python_check_with_real_interpreter() {
        let Ok(python) = which::which("python3") else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.py");
        let bad = dir.path().join("bad.py");
        let missing = dir.path().join("missing.py");
        std::fs::write(&good, "import os\nprint(os.getcwd())\n").unwrap();
        std::fs::write(&bad, "def broken(:\n    pass\n").unwrap();
        std::fs::write(&missing, "import surely_not_installed_pkg_xyz\n").unwrap();

        let check = PythonCheck::new(python).with_import_check(true);

        assert_eq!(check.check(&good).await.unwrap(), Validation::Valid);

        let Validation::Invalid { diagnostic } = check.check(&bad).await.unwrap() else {
            panic!("syntax error should be invalid");
        };
        assert!(diagnostic.contains("SyntaxError"));

        let Validation::Invalid { diagnostic } = check.check(&missing).await.unwrap() else {
            panic!("missing import should be invalid");
        };
        assert!(diagnostic.contains("surely_not_installed_pkg_xyz"));

        // The check never leaves bytecode behind
        assert!(!dir.path().join("__pycache__").exists());
    }

    #[tokio::test]
    async fn test_python_check_ignores_import_text_in_strings() {
        let Ok(python) = which::which("python3") else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("medlog.py");
        let source = r#""""Medication log.

import your old entries from the CSV export.
"""
import json

HELP = '''
from nowhere import anything
'''


def later():
    import surely_not_installed_pkg_xyz


print(json.dumps(HELP))
"#;
        std::fs::write(&script, source).unwrap();

        let check = PythonCheck::new(python).with_import_check(true);
        assert_eq!(check.check(&script).await.unwrap(), Validation::Valid);
    }

    #[tokio::test]
    async fn test_python_check_required_modules_without_import_scan() {
        let Ok(python) = which::which("python3") else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("main.py");
        std::fs::write(&script, "import surely_not_installed_pkg_xyz\n").unwrap();

        // Imports are not scanned, so only the required module is looked up
        let check = PythonCheck::new(&python).with_required_modules(vec!["json".to_string()]);
        assert_eq!(check.check(&script).await.unwrap(), Validation::Valid);

        let check = PythonCheck::new(&python)
            .with_required_modules(vec!["another_missing_pkg_xyz.sub".to_string()]);
        let Validation::Invalid { diagnostic } = check.check(&script).await.unwrap() else {
            panic!("missing required module should be invalid");
        };
        assert!(diagnostic.contains("another_missing_pkg_xyz"));
        assert!(!diagnostic.contains("surely_not_installed_pkg_xyz"));
    }
}
