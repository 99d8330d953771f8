use clap::{Args, Subcommand};
use cotador_core::config::LoadOptions;
use cotador_core::cpq::tax::{TaxConfig, TaxKind};
use cotador_core::errors::ApplicationError;
use cotador_core::money::format_percent;
use cotador_core::settings::SettingsService;
use cotador_db::SqlSettingsRepository;
use rust_decimal::Decimal;

use crate::commands::{
    block_on, finish, load_config, open_store, session_actor, to_data, CommandResult,
};

#[derive(Debug, Clone, Subcommand)]
pub enum SettingsCommand {
    #[command(about = "Show the tax rates applied to the session user's quotes")]
    Taxes,
    #[command(about = "Update tax rates for the session user (admin or diretor only)")]
    SetTaxes(TaxArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct TaxArgs {
    #[arg(long)]
    pub pis: Option<Decimal>,
    #[arg(long)]
    pub cofins: Option<Decimal>,
    #[arg(long)]
    pub csll: Option<Decimal>,
    #[arg(long)]
    pub irpj: Option<Decimal>,
    #[arg(long)]
    pub iss: Option<Decimal>,
}

impl TaxArgs {
    fn apply(&self, mut config: TaxConfig) -> TaxConfig {
        let updates = [
            (&mut config.pis, self.pis),
            (&mut config.cofins, self.cofins),
            (&mut config.csll, self.csll),
            (&mut config.irpj, self.irpj),
            (&mut config.iss, self.iss),
        ];
        for (field, update) in updates {
            if let Some(value) = update {
                *field = value;
            }
        }
        config
    }
}

fn render(config: &TaxConfig) -> String {
    TaxKind::ALL
        .iter()
        .map(|kind| format!("{}: {}", kind.as_str(), format_percent(config.rate(*kind))))
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn run(options: LoadOptions, command: SettingsCommand) -> CommandResult {
    finish(execute(options, command))
}

fn execute(options: LoadOptions, command: SettingsCommand) -> Result<CommandResult, CommandResult> {
    let name = match &command {
        SettingsCommand::Taxes => "settings.taxes",
        SettingsCommand::SetTaxes(_) => "settings.set_taxes",
    };
    let config = load_config(name, options)?;
    let actor = session_actor(&config);

    block_on(name, async {
        let pool = open_store(name, &config).await?;
        let settings = SettingsService::new(SqlSettingsRepository::new(pool.clone()));

        let outcome = async {
            let current = settings.tax_config(&actor.user_id).await?;
            match &command {
                SettingsCommand::Taxes => Ok::<_, ApplicationError>(current),
                SettingsCommand::SetTaxes(args) => {
                    let updated = args.apply(current);
                    settings.save_tax_config(&actor, &updated).await?;
                    Ok(updated)
                }
            }
        }
        .await;
        pool.close().await;

        let taxes = outcome.map_err(|error| CommandResult::from_application_error(name, error))?;
        Ok(CommandResult::success_with_data(name, render(&taxes), Some(to_data(name, &taxes)?)))
    })
}
