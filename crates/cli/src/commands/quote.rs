use clap::Args;
use cotador_core::config::{AppConfig, LoadOptions};
use cotador_core::cpq::profile::FamilyProfile;
use cotador_core::cpq::tax::TaxConfig;
use cotador_core::cpq::{QuoteEvaluation, QuoteInput, QuoteRuntime};
use cotador_core::domain::actor::Actor;
use cotador_core::domain::family::ProductFamily;
use cotador_core::domain::plan::OptionFlags;
use cotador_core::domain::term::ContractTerm;
use cotador_core::errors::ApplicationError;
use cotador_core::money::{format_brl, format_percent};
use cotador_core::proposal::ProposalDraft;
use cotador_core::settings::SettingsService;
use cotador_db::{DbPool, SqlSettingsRepository};
use rust_decimal::Decimal;
use serde_json::json;

use crate::commands::{
    block_on, finish, load_config, open_store, session_actor, to_data, CommandResult,
};

/// Offer inputs shared by `quote` and `proposal save`.
#[derive(Debug, Clone, Args)]
pub struct DraftArgs {
    #[arg(long, help = "Product family (radio|fiber|man|vm|pabx); defaults to quoting.default_family")]
    pub family: Option<ProductFamily>,
    #[arg(long = "plan", required = true, help = "Capacity tier to add; repeat for more line items")]
    pub plans: Vec<u32>,
    #[arg(long, default_value = "12", help = "Contract term in months (12|24|36|48|60)")]
    pub term: ContractTerm,
    #[arg(long, help = "Charge the installation fee on every line item")]
    pub installation: bool,
    #[arg(long, help = "Apply the fixed salesperson discount")]
    pub salesperson_discount: bool,
    #[arg(long, default_value = "0", help = "Director discount percentage (0-100)")]
    pub director_discount: Decimal,
    #[arg(long, help = "Deduct the partner referral commission")]
    pub referral: bool,
}

impl Default for DraftArgs {
    fn default() -> Self {
        Self {
            family: None,
            plans: Vec::new(),
            term: ContractTerm::Months12,
            installation: false,
            salesperson_discount: false,
            director_discount: Decimal::ZERO,
            referral: false,
        }
    }
}

/// Effective settings a draft is priced against.
pub(crate) struct PricingContext {
    pub profile: FamilyProfile,
    pub taxes: TaxConfig,
}

pub(crate) async fn pricing_context(
    pool: &DbPool,
    config: &AppConfig,
    family: ProductFamily,
    user_id: &str,
) -> Result<PricingContext, ApplicationError> {
    let settings = SettingsService::new(SqlSettingsRepository::new(pool.clone()))
        .with_payback_variants(config.quoting.payback_variants.clone());
    let profile = settings.profile(family).await?;
    let taxes = settings.tax_config(user_id).await?;
    Ok(PricingContext { profile, taxes })
}

pub(crate) fn build_draft(
    runtime: &QuoteRuntime,
    context: &PricingContext,
    actor: &Actor,
    args: &DraftArgs,
) -> Result<ProposalDraft, ApplicationError> {
    let mut draft = ProposalDraft::new(context.profile.family, actor.user_id.clone(), args.term);
    draft.set_discounts(actor, args.salesperson_discount, args.director_discount)?;
    draft.referral_partner = args.referral;

    let options = OptionFlags { include_installation: args.installation };
    for capacity_tier in &args.plans {
        draft.add_plan(runtime, &context.profile, *capacity_tier, options)?;
    }
    Ok(draft)
}

pub(crate) fn evaluate(
    runtime: &QuoteRuntime,
    context: &PricingContext,
    config: &AppConfig,
    draft: &ProposalDraft,
) -> Result<QuoteEvaluation, ApplicationError> {
    Ok(runtime.evaluate(&QuoteInput {
        profile: &context.profile,
        line_items: draft.line_items(),
        contract_term: draft.contract_term,
        discounts: &draft.discounts,
        referral_enabled: draft.referral_partner,
        markup_pct: config.quoting.markup_pct,
        commission_pct: config.quoting.commission_pct,
        tax_config: &context.taxes,
    })?)
}

pub(crate) fn summarize(draft: &ProposalDraft, evaluation: &QuoteEvaluation) -> String {
    let dre = evaluation.dre.for_display();
    let payback = &evaluation.payback;
    let mut lines: Vec<String> =
        draft.line_items().iter().map(|item| format!("- {}", item.description)).collect();
    lines.push(format!(
        "mensalidade: {} | instalação: {}",
        format_brl(evaluation.discounts.final_monthly),
        format_brl(evaluation.discounts.final_setup)
    ));
    if draft.referral_partner {
        lines.push(format!(
            "comissão parceiro indicador: {} ({})",
            format_brl(evaluation.discounts.referral_commission),
            format_percent(evaluation.discounts.referral_rate_pct)
        ));
    }
    lines.push(format!(
        "payback: {} de {} meses ({})",
        payback.actual_payback,
        payback.max_payback,
        if payback.is_valid { "aprovado" } else { "acima do limite" }
    ));
    lines.push(format!(
        "lucro líquido: {} | margem: {} | receita no contrato: {}",
        format_brl(dre.net_profit),
        format_percent(dre.net_margin),
        format_brl(dre.contract_revenue)
    ));
    lines.join("\n")
}

pub fn run(options: LoadOptions, args: DraftArgs) -> CommandResult {
    finish(execute(options, args))
}

fn execute(options: LoadOptions, args: DraftArgs) -> Result<CommandResult, CommandResult> {
    const COMMAND: &str = "quote";
    let config = load_config(COMMAND, options)?;
    let actor = session_actor(&config);
    let family = args.family.unwrap_or(config.quoting.default_family);

    block_on(COMMAND, async {
        let pool = open_store(COMMAND, &config).await?;
        let runtime = QuoteRuntime::default();

        let priced = async {
            let context = pricing_context(&pool, &config, family, &actor.user_id).await?;
            let draft = build_draft(&runtime, &context, &actor, &args)?;
            let evaluation = evaluate(&runtime, &context, &config, &draft)?;
            Ok::<_, ApplicationError>((draft, evaluation))
        }
        .await;
        pool.close().await;

        let (draft, evaluation) =
            priced.map_err(|error| CommandResult::from_application_error(COMMAND, error))?;
        let data = json!({
            "family": family,
            "contract_term": draft.contract_term,
            "line_items": to_data(COMMAND, &draft.line_items())?,
            "evaluation": to_data(COMMAND, &evaluation)?,
            "dre_display": to_data(COMMAND, &evaluation.dre.for_display())?,
        });
        Ok(CommandResult::success_with_data(COMMAND, summarize(&draft, &evaluation), Some(data)))
    })
}
