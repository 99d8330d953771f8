use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::plan::{OptionFlags, Plan};
use crate::domain::term::ContractTerm;
use crate::errors::ValidationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePrice {
    pub setup_amount: Decimal,
    pub monthly_amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

impl PricingTraceStep {
    pub fn new(stage: &str, detail: impl Into<String>, amount: Decimal) -> Self {
        Self { stage: stage.to_string(), detail: detail.into(), amount }
    }
}

pub trait PricingEngine: Send + Sync {
    fn price(
        &self,
        plan: &Plan,
        term: ContractTerm,
        options: OptionFlags,
    ) -> Result<LinePrice, ValidationError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicPricingEngine;

impl PricingEngine for DeterministicPricingEngine {
    fn price(
        &self,
        plan: &Plan,
        term: ContractTerm,
        options: OptionFlags,
    ) -> Result<LinePrice, ValidationError> {
        price_line_item(plan, term, options)
    }
}

/// Monthly price straight from the plan's term table; setup is the plan's
/// installation cost only when installation is included. No markup is applied
/// at this layer.
pub fn price_line_item(
    plan: &Plan,
    term: ContractTerm,
    options: OptionFlags,
) -> Result<LinePrice, ValidationError> {
    let monthly_amount = plan.monthly_price(term).ok_or_else(|| ValidationError::UnavailableTerm {
        plan: plan.display_label.clone(),
        term_months: term.months(),
    })?;
    let setup_amount =
        if options.include_installation { plan.installation_cost } else { Decimal::ZERO };

    Ok(LinePrice { setup_amount, monthly_amount })
}
