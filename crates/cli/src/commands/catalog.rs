use cotador_core::config::LoadOptions;
use cotador_core::domain::family::ProductFamily;
use cotador_core::domain::term::ContractTerm;
use cotador_core::money::format_brl;
use serde_json::json;

use crate::commands::quote::pricing_context;
use crate::commands::{
    block_on, finish, load_config, open_store, session_actor, to_data, CommandResult,
};

pub fn run(options: LoadOptions, family: Option<ProductFamily>) -> CommandResult {
    finish(execute(options, family))
}

fn execute(
    options: LoadOptions,
    family: Option<ProductFamily>,
) -> Result<CommandResult, CommandResult> {
    const COMMAND: &str = "catalog";
    let config = load_config(COMMAND, options)?;
    let actor = session_actor(&config);
    let family = family.unwrap_or(config.quoting.default_family);

    block_on(COMMAND, async {
        let pool = open_store(COMMAND, &config).await?;
        let context = pricing_context(&pool, &config, family, &actor.user_id).await;
        pool.close().await;
        let profile = context
            .map_err(|error| CommandResult::from_application_error(COMMAND, error))?
            .profile;

        let mut lines = vec![format!("{} ({})", family.display_name(), family.capacity_unit())];
        for plan in profile.catalog.plans() {
            let prices = ContractTerm::ALL
                .iter()
                .map(|term| match plan.monthly_price(*term) {
                    Some(price) => format!("{}m {}", term.months(), format_brl(price)),
                    None => format!("{}m -", term.months()),
                })
                .collect::<Vec<_>>()
                .join(" | ");
            lines.push(format!(
                "- {}: {} | instalação {}",
                plan.display_label,
                prices,
                format_brl(plan.installation_cost)
            ));
        }

        let data = json!({
            "family": family,
            "plans": to_data(COMMAND, &profile.catalog)?,
            "payback": to_data(COMMAND, &profile.payback)?,
            "tax_classes": to_data(COMMAND, &profile.tax_classes)?,
        });
        Ok(CommandResult::success_with_data(COMMAND, lines.join("\n"), Some(data)))
    })
}
