//! `jlaunch` - CLI for journey-launcher
//!
//! This binary discovers the apps in a workspace, reports their pre-flight
//! status and launches them.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::warn;

use journey_launcher::cli::{Cli, Command, ConfigCommand};
use journey_launcher::discovery::{self, find_app_mut};
use journey_launcher::humanize::{describe_recent, format_since};
use journey_launcher::runtime::{self, Workspace};
use journey_launcher::settings::{recents, RecentEntry};
use journey_launcher::validation::Unavailable;
use journey_launcher::{
    find_app, init_logging, Config, Error, Launcher, NoCheck, PythonCheck, ResolvedApp, Result,
    ScanRules, ScriptValidator, Settings, SettingsStore, Theme, ValidationOptions,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Validating a file must not depend on the active configuration loading
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        return handle_config_validate(file.clone(), cli.config.clone());
    }

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Config(cmd) => handle_config(&config, cmd),
        Command::Theme(cmd) => {
            let settings = Settings::open(config.settings_path())?;
            handle_theme(&settings, cmd.theme.map(Theme::from))
        }
        command => {
            let session = Session::open(config, cli.workspace)?;
            match command {
                Command::List(cmd) => handle_list(&session, cmd.json).await,
                Command::Launch(cmd) => handle_launch(&session, &cmd.name).await,
                Command::Check(cmd) => handle_check(&session, &cmd.name).await,
                Command::Recent(cmd) => handle_recent(&session, cmd.json),
                Command::Status(cmd) => handle_status(&session, cmd.json).await,
                Command::Config(_) | Command::Theme(_) => Ok(()),
            }
        }
    }
}

/// Everything a discovery-based command needs.
#[derive(Debug)]
struct Session {
    config: Config,
    workspace: Workspace,
    rules: ScanRules,
    settings: Settings,
    interpreter: Option<PathBuf>,
}

impl Session {
    fn open(config: Config, workspace_override: Option<PathBuf>) -> Result<Self> {
        let workspace = Workspace::locate(workspace_override, &config)?;
        let rules = ScanRules::from_config(&config, workspace.launcher_folder.as_deref());
        let settings = Settings::open(config.settings_path())?;
        let interpreter = match runtime::resolve_interpreter(&config.runtime.interpreter) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("{}", e);
                None
            }
        };
        Ok(Self {
            config,
            workspace,
            rules,
            settings,
            interpreter,
        })
    }

    fn validator(&self) -> Arc<dyn ScriptValidator> {
        if !self.config.validation.enabled {
            return Arc::new(NoCheck);
        }
        match &self.interpreter {
            Some(path) => Arc::new(PythonCheck::from_config(path.clone(), &self.config)),
            None => Arc::new(Unavailable::new(format!(
                "Interpreter '{}' was not found, so this script cannot be checked or launched.",
                self.config.runtime.interpreter
            ))),
        }
    }

    async fn discover(&self) -> Vec<ResolvedApp> {
        discovery::discover(
            &self.workspace.root,
            &self.rules,
            self.validator(),
            &ValidationOptions::from_config(&self.config),
            &self.settings,
        )
        .await
    }

    fn launcher(&self) -> Launcher {
        let interpreter = self
            .interpreter
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.config.runtime.interpreter));
        Launcher::new(interpreter, self.config.settings.max_recents)
    }
}

fn first_line(text: &str) -> &str {
    text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}

fn last_opened(app: &ResolvedApp) -> String {
    app.last_launched_at
        .map_or_else(|| "never".to_string(), format_since)
}

async fn handle_list(session: &Session, json: bool) -> Result<()> {
    let apps = session.discover().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&apps)?);
        return Ok(());
    }

    if apps.is_empty() {
        println!("No apps found in {}", session.workspace.root.display());
        return Ok(());
    }

    let name_width = apps.iter().map(|a| a.name.len()).max().unwrap_or(4).max(4);
    let entry_width = apps
        .iter()
        .map(|a| a.relative_script().display().to_string().len())
        .max()
        .unwrap_or(5)
        .max(5);

    println!(
        "{:<name_width$}  {:<entry_width$}  {:<11}  {:<8}  LAST OPENED",
        "NAME", "ENTRY", "MATCH", "STATUS"
    );
    for app in &apps {
        println!(
            "{:<name_width$}  {:<entry_width$}  {:<11}  {:<8}  {}",
            app.name,
            app.relative_script().display(),
            app.entry.rank.to_string(),
            app.state.to_string(),
            last_opened(app)
        );
        if let Some(diagnostic) = &app.diagnostic {
            println!("{:<name_width$}  ! {}", "", first_line(diagnostic));
        }
    }
    Ok(())
}

async fn handle_launch(session: &Session, name: &str) -> Result<()> {
    let mut apps = session.discover().await;
    let app = find_app_mut(&mut apps, name).ok_or_else(|| Error::app_not_found(name))?;

    let handle = session.launcher().launch(app, &session.settings)?;
    println!(
        "Launched {} ({}) with pid {}",
        app.name,
        app.relative_script().display(),
        handle.pid
    );
    Ok(())
}

async fn handle_check(session: &Session, name: &str) -> Result<()> {
    let apps = session.discover().await;
    let app = find_app(&apps, name).ok_or_else(|| Error::app_not_found(name))?;

    println!("{}", app.name);
    println!("  Folder:      {}", app.folder.display());
    println!(
        "  Entry:       {} ({})",
        app.relative_script().display(),
        app.entry.rank
    );
    println!("  Status:      {}", app.state);
    println!("  Last opened: {}", last_opened(app));
    if let Some(diagnostic) = &app.diagnostic {
        println!();
        println!("{diagnostic}");
    }
    Ok(())
}

fn handle_recent(session: &Session, json: bool) -> Result<()> {
    let apps = discovery::scan(&session.workspace.root, &session.rules);
    let stored: HashMap<String, RecentEntry> = recents::all(&session.settings)?
        .into_iter()
        .map(|entry| (entry.name.clone(), entry))
        .collect();

    let rows: Vec<(String, Option<&RecentEntry>)> = apps
        .iter()
        .map(|app| (app.name.clone(), stored.get(&app.name)))
        .collect();

    if json {
        let value: Vec<_> = rows
            .iter()
            .map(|(name, entry)| {
                serde_json::json!({
                    "name": name,
                    "last_opened_at": entry.map(|e| e.raw.clone()),
                    "last_opened": entry.map_or_else(|| "never".to_string(), describe_recent),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No apps found in {}", session.workspace.root.display());
    }
    for (name, entry) in rows {
        let text = entry.map_or_else(|| "never".to_string(), describe_recent);
        println!("{name} last opened: {text}");
    }
    Ok(())
}

fn handle_theme(settings: &dyn SettingsStore, theme: Option<Theme>) -> Result<()> {
    match theme {
        Some(theme) => {
            theme.save(settings)?;
            println!("Theme set to {theme}");
        }
        None => println!("{}", Theme::load(settings)?),
    }
    Ok(())
}

async fn handle_status(session: &Session, json: bool) -> Result<()> {
    let apps = session.discover().await;
    let invalid = apps.iter().filter(|a| !a.valid).count();
    let stored = session.settings.count()?;

    if json {
        let status = serde_json::json!({
            "workspace_root": session.workspace.root,
            "launcher_folder": session.workspace.launcher_folder,
            "interpreter": session.interpreter,
            "validation_enabled": session.config.validation.enabled,
            "settings_path": session.settings.path(),
            "stored_settings": stored,
            "apps": apps.len(),
            "valid": apps.len() - invalid,
            "invalid": invalid,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("jlaunch status");
        println!("--------------");
        println!("Workspace:     {}", session.workspace.root.display());
        if let Some(folder) = &session.workspace.launcher_folder {
            println!("Launcher dir:  {folder}");
        }
        match &session.interpreter {
            Some(path) => println!("Interpreter:   {}", path.display()),
            None => println!(
                "Interpreter:   {} (not found)",
                session.config.runtime.interpreter
            ),
        }
        println!(
            "Checks:        {}",
            if session.config.validation.enabled {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!("Settings:      {}", session.settings.path().display());
        println!(
            "Apps:          {} ({} valid, {} invalid)",
            apps.len(),
            apps.len() - invalid,
            invalid
        );
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Workspace]");
                match &config.workspace.root {
                    Some(root) => println!("  Root:               {}", root.display()),
                    None => println!("  Root:               (parent of launcher folder)"),
                }
                println!(
                    "  Extra excluded:     {}",
                    config.workspace.extra_excluded_dirs.join(", ")
                );
                println!();
                println!("[Runtime]");
                println!("  Interpreter:        {}", config.runtime.interpreter);
                println!("  Script extension:   {}", config.runtime.script_extension);
                println!();
                println!("[Validation]");
                println!("  Enabled:            {}", config.validation.enabled);
                println!("  Timeout (secs):     {}", config.validation.timeout_secs);
                println!("  Max parallel:       {}", config.validation.max_parallel);
                println!("  Check imports:      {}", config.validation.check_imports);
                println!(
                    "  Required modules:   {}",
                    config.validation.required_modules.join(", ")
                );
                println!();
                println!("[Settings]");
                println!("  Database path:      {}", config.settings_path().display());
                println!("  Max recents:        {}", config.settings.max_recents);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            return handle_config_validate(file, None);
        }
    }
    Ok(())
}

fn handle_config_validate(file: Option<PathBuf>, global: Option<PathBuf>) -> Result<()> {
    let path = file.or(global).unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    Config::load_from(Some(path))?;
    println!("Configuration is valid.");
    Ok(())
}
