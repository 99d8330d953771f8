pub mod catalog;
pub mod commission;
pub mod defaults;
pub mod discount;
pub mod dre;
pub mod payback;
pub mod pricing;
pub mod profile;
pub mod tax;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::plan::OptionFlags;
use crate::domain::proposal::LineItem;
use crate::domain::term::ContractTerm;
use crate::errors::DomainError;

use self::{
    commission::PartnerCommissionTable,
    discount::{apply_discounts, DiscountOutcome, DiscountState},
    dre::{project, CostBreakdown, DreInput},
    payback::PaybackAssessment,
    pricing::{DeterministicPricingEngine, PricingEngine, PricingTraceStep},
    profile::FamilyProfile,
    tax::TaxConfig,
};

#[derive(Clone, Debug)]
pub struct QuoteInput<'a> {
    pub profile: &'a FamilyProfile,
    pub line_items: &'a [LineItem],
    pub contract_term: ContractTerm,
    pub discounts: &'a DiscountState,
    pub referral_enabled: bool,
    pub markup_pct: Decimal,
    pub commission_pct: Decimal,
    pub tax_config: &'a TaxConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteEvaluation {
    pub raw_total_setup: Decimal,
    pub raw_total_monthly: Decimal,
    pub discounts: DiscountOutcome,
    pub dre: CostBreakdown,
    pub payback: PaybackAssessment,
    pub trace: Vec<PricingTraceStep>,
}

pub struct QuoteRuntime<P = DeterministicPricingEngine> {
    pricing_engine: P,
    commission_table: PartnerCommissionTable,
}

impl<P> QuoteRuntime<P> {
    pub fn new(pricing_engine: P, commission_table: PartnerCommissionTable) -> Self {
        Self { pricing_engine, commission_table }
    }

    pub fn commission_table(&self) -> &PartnerCommissionTable {
        &self.commission_table
    }
}

impl Default for QuoteRuntime<DeterministicPricingEngine> {
    fn default() -> Self {
        Self::new(DeterministicPricingEngine, PartnerCommissionTable::default())
    }
}

impl<P: PricingEngine> QuoteRuntime<P> {
    /// Prices one plan of the profile's catalog into a line item.
    pub fn price_line(
        &self,
        profile: &FamilyProfile,
        capacity_tier: u32,
        term: ContractTerm,
        options: OptionFlags,
    ) -> Result<LineItem, DomainError> {
        let plan = profile.catalog.require(profile.family, capacity_tier)?;
        let price = self.pricing_engine.price(plan, term, options)?;
        Ok(LineItem::new(profile.family, plan, term, options, price))
    }

    /// Totals line items, runs the discount chain, projects the DRE over the
    /// plans' cost basis and checks payback of the installation investment.
    pub fn evaluate(&self, input: &QuoteInput<'_>) -> Result<QuoteEvaluation, DomainError> {
        let term = input.contract_term;
        if let Some(stray) =
            input.line_items.iter().find(|item| item.computation_details.term != term)
        {
            return Err(DomainError::InvariantViolation(format!(
                "line item `{}` was priced for {} but the proposal term is {term}",
                stray.description, stray.computation_details.term
            )));
        }

        let raw_total_setup: Decimal = input.line_items.iter().map(|item| item.setup_amount).sum();
        let raw_total_monthly: Decimal =
            input.line_items.iter().map(|item| item.monthly_amount).sum();

        let discounts = apply_discounts(
            raw_total_setup,
            raw_total_monthly,
            input.discounts,
            &self.commission_table,
            term,
            input.referral_enabled,
        )?;

        let base_cost: Decimal =
            input.line_items.iter().map(|item| item.computation_details.plan.base_cost()).sum();
        let dre = project(
            &DreInput {
                base_cost,
                markup_pct: input.markup_pct,
                commission_pct: input.commission_pct,
                tax_config: input.tax_config,
                tax_classes: &input.profile.tax_classes,
                discounts: input.discounts,
                referral_enabled: input.referral_enabled,
                contract_term: term,
            },
            &self.commission_table,
        )?;

        let investment: Decimal = input
            .line_items
            .iter()
            .map(|item| item.computation_details.plan.installation_cost)
            .sum();
        let payback = input.profile.payback.validate(investment, discounts.final_monthly, term);

        debug!(
            event_name = "cpq.quote.evaluated",
            family = input.profile.family.as_str(),
            term_months = term.months(),
            line_items = input.line_items.len(),
            final_monthly = %discounts.final_monthly,
            payback_valid = payback.is_valid,
            "quote evaluated"
        );

        let trace = vec![
            PricingTraceStep::new("raw_setup", "sum(line.setup_amount)", raw_total_setup),
            PricingTraceStep::new("raw_monthly", "sum(line.monthly_amount)", raw_total_monthly),
            PricingTraceStep::new(
                "discounted_monthly",
                format!(
                    "raw * salesperson({}) * director({})",
                    input.discounts.salesperson_factor(),
                    input.discounts.director_factor()
                ),
                discounts.discounted_monthly,
            ),
            PricingTraceStep::new(
                "referral_commission",
                format!("discounted_monthly * {}%", discounts.referral_rate_pct),
                discounts.referral_commission,
            ),
            PricingTraceStep::new(
                "final_monthly",
                "discounted_monthly - referral_commission",
                discounts.final_monthly,
            ),
            PricingTraceStep::new("final_setup", "raw_setup * discounts", discounts.final_setup),
        ];

        Ok(QuoteEvaluation {
            raw_total_setup,
            raw_total_monthly,
            discounts,
            dre,
            payback,
            trace,
        })
    }
}
