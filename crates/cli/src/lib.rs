pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use cotador_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use cotador_core::domain::actor::Role;
use cotador_core::domain::family::ProductFamily;
use tracing::Level;

use crate::commands::proposal::ProposalCommand;
use crate::commands::quote::DraftArgs;
use crate::commands::settings::SettingsCommand;

#[derive(Debug, Parser)]
#[command(
    name = "cotador",
    about = "Telecom commercial quoting CLI",
    long_about = "Price telecom offers, project their DRE, and save versioned commercial proposals.",
    after_help = "Examples:\n  cotador quote --family radio --plan 20 --term 12 --installation\n  cotador proposal save --client \"Mercado Boa Vista\" --plan 20 --referral\n  cotador proposal history RAD0001\n  cotador doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to cotador.toml")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Acting user id (overrides session.user_id)")]
    user: Option<String>,
    #[arg(long, global = true, help = "Acting role: admin|diretor|usuario (overrides session.role)")]
    role: Option<Role>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price an offer: discounts, referral commission, payback and DRE")]
    Quote(DraftArgs),
    #[command(about = "List the effective plan catalog of a product family")]
    Catalog {
        #[arg(long, help = "Product family; defaults to quoting.default_family")]
        family: Option<ProductFamily>,
    },
    /// Save, inspect and list versioned proposals
    #[command(subcommand)]
    Proposal(ProposalCommand),
    /// Inspect or update per-user tax rates
    #[command(subcommand)]
    Settings(SettingsCommand),
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity and pricing settings")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                user_id: self.user.clone(),
                role: self.role,
                ..ConfigOverrides::default()
            },
        }
    }
}

/// Installs the global subscriber. Logs go to stderr so stdout stays a clean
/// JSON payload.
pub fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when embedded in tests.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Quote(args) => commands::quote::run(options, args),
        Command::Catalog { family } => commands::catalog::run(options, family),
        Command::Proposal(command) => commands::proposal::run(options, command),
        Command::Settings(command) => commands::settings::run(options, command),
        Command::Migrate => commands::migrate::run(options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => commands::doctor::run(options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
