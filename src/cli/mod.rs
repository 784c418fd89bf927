//! CLI module for the Gatehouse command-line interface.
//!
//! One-shot subcommands run against a fresh session that ends with the
//! process:
//! - `register`, `login`, `trial` - authenticate and show the catalog
//! - `catalog`, `download <id>`, `view-manual <id>` - browse as a visitor or member
//! - `admin ...` - account management, registration codes, site settings
//! - `config check` - validate configuration file
//!
//! `shell` (also the default) keeps one session open across commands.

mod render;
mod shell;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use gatehouse::admin::{Confirmation, DeleteOutcome, Preconfirmed};
use gatehouse::catalog::LocalAssetFetcher;
use gatehouse::clock::Clock;
use gatehouse::config::Config;
use gatehouse::db::{AccountSummary, SiteConfigPatch};
use gatehouse::error::ErrorCode;
use gatehouse::session::{RegistrationForm, TrialForm};
use gatehouse::Portal;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "gatehouse")]
#[command(author, version, about = "Gated download portal for manuals and DSL files", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "gatehouse.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Override the data directory from the configuration file
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Keep all state in memory; nothing is written to disk
    #[arg(long)]
    pub ephemeral: bool,

    /// Launch query string, e.g. `admin=true`
    #[arg(long, env = "GATEHOUSE_QUERY")]
    pub query: Option<String>,

    /// Subcommand to run (if none, starts the interactive shell)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Credentials for commands that can run as a signed-in member
#[derive(Args, Debug, Clone, Default)]
pub struct Credentials {
    /// Sign in with this email address first
    #[arg(long, env = "GATEHOUSE_EMAIL")]
    pub email: Option<String>,

    /// Password for --email
    #[arg(long, env = "GATEHOUSE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a member account with a registration code
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Defaults to --password
        #[arg(long)]
        confirm_password: Option<String>,
        /// Purchase or admin code
        #[arg(long)]
        code: String,
    },

    /// Sign in and show the catalog
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Start a free trial; prints the generated password
    Trial {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "beginner")]
        experience_level: String,
    },

    /// Show the catalog
    Catalog {
        #[command(flatten)]
        auth: Credentials,
    },

    /// Download a catalog entry
    Download {
        /// Catalog entry id, e.g. manual-1
        id: String,
        #[command(flatten)]
        auth: Credentials,
    },

    /// Open the companion manual of a DSL file
    ViewManual {
        /// Catalog entry id, e.g. dsl-writegenius
        id: String,
        #[command(flatten)]
        auth: Credentials,
    },

    /// Administration commands
    Admin {
        #[command(flatten)]
        auth: Credentials,
        #[command(subcommand)]
        action: AdminCommands,
    },

    /// Interactive session
    Shell,

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Admin subcommands
#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// List every account
    Accounts {
        /// Print JSON without passwords instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Delete a member account
    Delete {
        /// Account id
        id: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Export member accounts as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate a registration code
    Code,
    /// Show or change site settings
    Site {
        #[arg(long, action = ArgAction::Set)]
        community: Option<bool>,
        #[arg(long, action = ArgAction::Set)]
        maintenance: Option<bool>,
        /// Banner text; an empty string clears it
        #[arg(long)]
        announcement: Option<String>,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

/// Asks on the terminal
pub struct StdinConfirmation;

impl Confirmation for StdinConfirmation {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        let _ = io::stdout().flush();
        let mut answer = String::new();
        match io::stdin().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Turn a domain failure into the message shown to the user.
fn user_error(code: ErrorCode, err: &dyn std::error::Error) -> anyhow::Error {
    debug!(code = %code, error = %err, "Command failed");
    match code {
        ErrorCode::Storage => anyhow::anyhow!("{} ({})", code.user_message(), err),
        _ => anyhow::anyhow!(code.user_message()),
    }
}

/// Run a CLI command
pub async fn run_command(cli: &Cli, portal: &mut Portal, fetcher: &LocalAssetFetcher) -> Result<()> {
    match &cli.command {
        Some(Commands::Register {
            name,
            email,
            password,
            confirm_password,
            code,
        }) => {
            let form = RegistrationForm {
                name: name.clone(),
                email: email.clone(),
                password: password.clone(),
                confirm_password: confirm_password.clone().unwrap_or_else(|| password.clone()),
                registration_code: code.clone(),
            };
            register(portal, &form).await?;
            show_catalog(portal).await
        }
        Some(Commands::Login { email, password }) => {
            login(portal, email, password).await?;
            show_catalog(portal).await
        }
        Some(Commands::Trial {
            name,
            email,
            experience_level,
        }) => {
            let form = TrialForm {
                name: name.clone(),
                email: email.clone(),
                experience_level: experience_level.clone(),
            };
            start_trial(portal, &form).await?;
            show_catalog(portal).await
        }
        Some(Commands::Catalog { auth }) => {
            sign_in(portal, auth).await?;
            show_catalog(portal).await
        }
        Some(Commands::Download { id, auth }) => {
            sign_in(portal, auth).await?;
            download(portal, fetcher, id).await
        }
        Some(Commands::ViewManual { id, auth }) => {
            sign_in(portal, auth).await?;
            view_manual(portal, fetcher, id).await
        }
        Some(Commands::Admin { auth, action }) => {
            sign_in(portal, auth).await?;
            run_admin(portal, action).await
        }
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli),
        Some(Commands::Shell) | None => shell::run(portal, fetcher).await,
    }
}

async fn run_admin(portal: &Portal, action: &AdminCommands) -> Result<()> {
    match action {
        AdminCommands::Accounts { json } => admin_accounts(portal, *json).await,
        AdminCommands::Delete { id, yes } => {
            if *yes {
                admin_delete(portal, id, &Preconfirmed(true)).await
            } else {
                admin_delete(portal, id, &StdinConfirmation).await
            }
        }
        AdminCommands::Export { output } => admin_export(portal, output.as_deref()).await,
        AdminCommands::Code => admin_code(portal),
        AdminCommands::Site {
            community,
            maintenance,
            announcement,
        } => {
            let patch = SiteConfigPatch {
                community_enabled: *community,
                maintenance_mode: *maintenance,
                announcement: announcement.clone(),
            };
            admin_site(portal, &patch).await
        }
    }
}

/// Sign in first when credentials were given.
async fn sign_in(portal: &mut Portal, auth: &Credentials) -> Result<()> {
    match (&auth.email, &auth.password) {
        (Some(email), Some(password)) => login(portal, email, password).await,
        (None, None) => Ok(()),
        _ => anyhow::bail!("--email and --password must be given together"),
    }
}

async fn register(portal: &mut Portal, form: &RegistrationForm) -> Result<()> {
    let account = portal
        .session
        .register(form)
        .await
        .map_err(|e| user_error(e.code(), &e))?;
    println!("Welcome, {}! Your account is ready.", account.name);
    Ok(())
}

async fn login(portal: &mut Portal, email: &str, password: &str) -> Result<()> {
    let account = portal
        .session
        .login(email, password)
        .await
        .map_err(|e| user_error(e.code(), &e))?;
    println!("Signed in as {}.", account.name);
    Ok(())
}

async fn start_trial(portal: &mut Portal, form: &TrialForm) -> Result<()> {
    let signup = portal
        .session
        .start_trial(form)
        .await
        .map_err(|e| user_error(e.code(), &e))?;
    println!("Your trial has started.");
    println!();
    println!("  Email:    {}", signup.account.email);
    println!("  Password: {}", signup.password);
    if let Some(window) = signup.account.trial_window() {
        println!("  Ends:     {}", render::format_time(&window.end));
    }
    println!();
    println!("Write the password down; it is shown only once.");
    Ok(())
}

async fn logout(portal: &mut Portal) -> Result<()> {
    portal
        .session
        .logout()
        .await
        .map_err(|e| user_error(e.code(), &e))?;
    println!("Signed out.");
    Ok(())
}

async fn show_catalog(portal: &Portal) -> Result<()> {
    let view = portal.view().await.map_err(|e| user_error(e.code(), &e))?;
    render::print_view(&view, portal.session.current_account());
    Ok(())
}

async fn download(portal: &Portal, fetcher: &LocalAssetFetcher, id: &str) -> Result<()> {
    let view = portal.view().await.map_err(|e| user_error(e.code(), &e))?;
    let asset = portal
        .catalog
        .download(&view, id, fetcher)
        .map_err(|e| user_error(e.code(), &e))?;
    println!(
        "Downloading {} to {}",
        asset.filename,
        fetcher.destination(&asset).display()
    );
    Ok(())
}

async fn view_manual(portal: &Portal, fetcher: &LocalAssetFetcher, id: &str) -> Result<()> {
    let view = portal.view().await.map_err(|e| user_error(e.code(), &e))?;
    let asset = portal
        .catalog
        .view_manual(&view, id, fetcher)
        .map_err(|e| user_error(e.code(), &e))?;
    // the path is how a terminal opens a manual
    println!("Manual: {}", fetcher.viewer_path(&asset).display());
    Ok(())
}

async fn admin_accounts(portal: &Portal, json: bool) -> Result<()> {
    let console = portal.admin().map_err(|e| user_error(e.code(), &e))?;
    let accounts = console
        .list_accounts()
        .await
        .map_err(|e| user_error(e.code(), &e))?;
    if json {
        let summaries: Vec<AccountSummary> = accounts.iter().map(AccountSummary::from).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        render::print_accounts(&accounts, portal.clock.now());
    }
    Ok(())
}

async fn admin_delete(portal: &Portal, id: &str, confirmation: &dyn Confirmation) -> Result<()> {
    let console = portal.admin().map_err(|e| user_error(e.code(), &e))?;
    let outcome = console
        .delete_account(id, confirmation)
        .await
        .map_err(|e| user_error(e.code(), &e))?;
    match outcome {
        DeleteOutcome::Deleted => println!("Account {} deleted.", id),
        DeleteOutcome::NotFound => println!("No member account with id {}.", id),
        DeleteOutcome::Cancelled => println!("Cancelled."),
    }
    Ok(())
}

async fn admin_export(portal: &Portal, output: Option<&Path>) -> Result<()> {
    let console = portal.admin().map_err(|e| user_error(e.code(), &e))?;
    let json = console
        .export_all()
        .await
        .map_err(|e| user_error(e.code(), &e))?;
    match output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write export to {}", path.display()))?;
            println!("Exported accounts to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn admin_code(portal: &Portal) -> Result<()> {
    let console = portal.admin().map_err(|e| user_error(e.code(), &e))?;
    println!("{}", console.generate_registration_code());
    Ok(())
}

async fn admin_site(portal: &Portal, patch: &SiteConfigPatch) -> Result<()> {
    let console = portal.admin().map_err(|e| user_error(e.code(), &e))?;
    let site = if patch.is_empty() {
        console.site_config().await
    } else {
        console.set_site_config(patch).await
    }
    .map_err(|e| user_error(e.code(), &e))?;
    render::print_site(&site);
    Ok(())
}

/// Check configuration file validity
pub fn cmd_config_check(cli: &Cli) -> Result<()> {
    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!(
            "[!!] Configuration file not found: {}",
            config_path.display()
        );
        println!();
        println!("A default configuration will be used.");
        println!("To create a custom configuration, copy gatehouse.example.toml to gatehouse.toml");
        return Ok(());
    }

    match Config::load(config_path) {
        Ok(config) => {
            println!("[OK] Configuration file is valid!");
            println!();
            println!("=== Configuration Summary ===");
            println!();
            println!("Storage:");
            println!("  Data Dir:     {}", config.storage.data_dir.display());
            println!();
            println!("Auth:");
            println!("  Code Prefix:  {}", config.auth.code_prefix);
            println!(
                "  Client Admin Signals: {}",
                if config.auth.trust_client_admin_signals {
                    "Trusted"
                } else {
                    "Ignored"
                }
            );
            println!();
            println!("Trial:");
            println!("  Duration:     {} days", config.trial.duration_days);
            println!("  Downloads:    {}", config.trial.download_limit);
            println!();
            println!("Catalog:");
            println!("  Assets:       {}", config.catalog.assets_root.display());
            println!("  Downloads To: {}", config.catalog.downloads_dir.display());
            println!();
            println!("Logging:");
            println!("  Level:        {}", config.logging.level);
            println!();
            Ok(())
        }
        Err(e) => {
            println!("[!!] Configuration file is invalid!");
            println!();
            println!("Error: {:#}", e);
            println!();
            anyhow::bail!("Configuration validation failed")
        }
    }
}
