use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::family::ProductFamily;
use crate::domain::plan::Plan;
use crate::errors::{DomainError, ValidationError};

/// Plans of one product family, ordered by capacity tier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Plan>", into = "Vec<Plan>")]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    pub fn new(mut plans: Vec<Plan>) -> Self {
        plans.sort_by_key(|plan| plan.capacity_tier);
        Self { plans }
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn find(&self, capacity_tier: u32) -> Option<&Plan> {
        self.plans.iter().find(|plan| plan.capacity_tier == capacity_tier)
    }

    /// Looks up a plan a caller already selected. A miss here means the
    /// selector and the catalog disagree, so it is logged as an invariant
    /// violation before being reported.
    pub fn require(
        &self,
        family: ProductFamily,
        capacity_tier: u32,
    ) -> Result<&Plan, DomainError> {
        self.find(capacity_tier).ok_or_else(|| {
            warn!(
                event_name = "cpq.catalog.lookup_miss",
                family = family.as_str(),
                capacity_tier,
                "selected capacity tier is not present in the plan catalog"
            );
            DomainError::PlanNotFound { family, capacity_tier }
        })
    }

    /// Replaces plans whose capacity tier appears in `overrides` and appends
    /// tiers the defaults do not carry.
    pub fn with_overrides(self, overrides: PlanCatalog) -> Self {
        let mut plans = self.plans;
        for plan in overrides.plans {
            match plans.iter_mut().find(|existing| existing.capacity_tier == plan.capacity_tier) {
                Some(existing) => *existing = plan,
                None => plans.push(plan),
            }
        }
        Self::new(plans)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.plans.is_empty() {
            return Err(ValidationError::Catalog("catalog has no plans".to_string()));
        }

        let mut seen = BTreeSet::new();
        for plan in &self.plans {
            if plan.capacity_tier == 0 {
                return Err(ValidationError::Catalog(format!(
                    "plan `{}` must have a positive capacity tier",
                    plan.display_label
                )));
            }
            if !seen.insert(plan.capacity_tier) {
                return Err(ValidationError::Catalog(format!(
                    "capacity tier {} appears more than once",
                    plan.capacity_tier
                )));
            }
            if plan.installation_cost < Decimal::ZERO
                || plan.operating_base_cost < Decimal::ZERO
                || plan.auxiliary_equipment_cost.is_some_and(|cost| cost < Decimal::ZERO)
            {
                return Err(ValidationError::Catalog(format!(
                    "plan `{}` has a negative cost",
                    plan.display_label
                )));
            }
            if plan.monthly_price_by_term.values().any(|price| *price < Decimal::ZERO) {
                return Err(ValidationError::Catalog(format!(
                    "plan `{}` has a negative monthly price",
                    plan.display_label
                )));
            }
            if plan.available_terms().is_empty() {
                return Err(ValidationError::Catalog(format!(
                    "plan `{}` is not available on any contract term",
                    plan.display_label
                )));
            }
        }

        Ok(())
    }
}

impl From<Vec<Plan>> for PlanCatalog {
    fn from(plans: Vec<Plan>) -> Self {
        Self::new(plans)
    }
}

impl From<PlanCatalog> for Vec<Plan> {
    fn from(catalog: PlanCatalog) -> Self {
        catalog.plans
    }
}
