use clap::{Args, Subcommand};
use cotador_core::config::{AppConfig, LoadOptions};
use cotador_core::cpq::QuoteRuntime;
use cotador_core::domain::proposal::{BaseId, Client, ProposalAggregate, ProposalId};
use cotador_core::errors::ApplicationError;
use cotador_core::money::format_brl;
use cotador_core::proposal::ProposalService;
use cotador_db::{DbPool, SqlProposalRepository};
use serde_json::json;

use crate::commands::quote::{build_draft, evaluate, pricing_context, summarize, DraftArgs};
use crate::commands::{block_on, finish, load_config, open_store, session_actor, CommandResult};

#[derive(Debug, Clone, Subcommand)]
pub enum ProposalCommand {
    #[command(about = "Price an offer and persist it as a new proposal version")]
    Save(SaveArgs),
    #[command(about = "Show one saved version by id (e.g. RAD0001_v2)")]
    Show { id: String },
    #[command(about = "List every version of a proposal lineage (e.g. RAD0001)")]
    History { base_id: String },
    #[command(about = "List the latest version of every proposal")]
    List,
}

#[derive(Debug, Clone, Args)]
pub struct SaveArgs {
    #[arg(long, help = "Client name")]
    pub client: String,
    #[arg(long, help = "Client CNPJ/CPF")]
    pub document: Option<String>,
    #[arg(long, help = "Client contact")]
    pub contact: Option<String>,
    #[arg(long, default_value = "", help = "Account manager shown on the proposal")]
    pub account_manager: String,
    #[arg(long, help = "Append a new version to this lineage instead of starting one")]
    pub base_id: Option<String>,
    #[command(flatten)]
    pub draft: DraftArgs,
}

pub fn run(options: LoadOptions, command: ProposalCommand) -> CommandResult {
    finish(execute(options, command))
}

fn execute(options: LoadOptions, command: ProposalCommand) -> Result<CommandResult, CommandResult> {
    let name = match &command {
        ProposalCommand::Save(_) => "proposal.save",
        ProposalCommand::Show { .. } => "proposal.show",
        ProposalCommand::History { .. } => "proposal.history",
        ProposalCommand::List => "proposal.list",
    };
    let config = load_config(name, options)?;

    block_on(name, async {
        let pool = open_store(name, &config).await?;
        let outcome = match command {
            ProposalCommand::Save(args) => save(&pool, &config, args).await,
            ProposalCommand::Show { id } => show(&pool, ProposalId(id)).await,
            ProposalCommand::History { base_id } => history(&pool, BaseId(base_id)).await,
            ProposalCommand::List => list(&pool).await,
        };
        pool.close().await;

        let (message, data) =
            outcome.map_err(|error| CommandResult::from_application_error(name, error))?;
        Ok(CommandResult::success_with_data(name, message, Some(data)))
    })
}

fn service(pool: &DbPool) -> ProposalService<SqlProposalRepository> {
    ProposalService::new(SqlProposalRepository::new(pool.clone()), Default::default())
}

fn headline(proposal: &ProposalAggregate) -> String {
    format!(
        "{} | {} | {} | mensalidade {} | instalação {}",
        proposal.id,
        proposal.client.name,
        proposal.terms.contract_term,
        format_brl(proposal.total_monthly),
        format_brl(proposal.total_setup)
    )
}

async fn save(
    pool: &DbPool,
    config: &AppConfig,
    args: SaveArgs,
) -> Result<(String, serde_json::Value), ApplicationError> {
    let actor = session_actor(config);
    let family = args.draft.family.unwrap_or(config.quoting.default_family);
    let runtime = QuoteRuntime::default();

    let context = pricing_context(pool, config, family, &actor.user_id).await?;
    let mut draft = build_draft(&runtime, &context, &actor, &args.draft)?;
    draft.client = Client {
        name: args.client.trim().to_string(),
        document: args.document,
        contact: args.contact,
    };
    draft.account_manager = args.account_manager;
    let evaluation = evaluate(&runtime, &context, config, &draft)?;

    let base_id = args.base_id.map(BaseId);
    let proposals = ProposalService::new(
        SqlProposalRepository::new(pool.clone()),
        runtime.commission_table().clone(),
    );
    let saved = proposals.save(&draft, base_id.as_ref()).await?;

    let message = format!("saved {}\n{}", headline(&saved), summarize(&draft, &evaluation));
    Ok((message, json!({ "proposal": saved, "payback": evaluation.payback })))
}

async fn show(
    pool: &DbPool,
    id: ProposalId,
) -> Result<(String, serde_json::Value), ApplicationError> {
    let proposal = service(pool).load(&id).await?;
    Ok((headline(&proposal), json!({ "proposal": proposal })))
}

async fn history(
    pool: &DbPool,
    base_id: BaseId,
) -> Result<(String, serde_json::Value), ApplicationError> {
    let versions = service(pool).history(&base_id).await?;
    let message = versions.iter().map(headline).collect::<Vec<_>>().join("\n");
    Ok((message, json!({ "versions": versions })))
}

async fn list(pool: &DbPool) -> Result<(String, serde_json::Value), ApplicationError> {
    let proposals = service(pool).refresh().await?;
    let message = if proposals.is_empty() {
        "no proposals saved yet".to_string()
    } else {
        proposals.iter().map(headline).collect::<Vec<_>>().join("\n")
    };
    Ok((message, json!({ "proposals": proposals })))
}
