use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::term::ContractTerm;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Capacity of the plan in the family's unit (Mbps, vCPU, extensions).
    pub capacity_tier: u32,
    pub display_label: String,
    pub monthly_price_by_term: BTreeMap<ContractTerm, Decimal>,
    pub installation_cost: Decimal,
    pub operating_base_cost: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary_equipment_cost: Option<Decimal>,
}

impl Plan {
    /// Monthly price for `term`, or `None` when the plan is not sold on that
    /// term. A zero price means unavailable, never free.
    pub fn monthly_price(&self, term: ContractTerm) -> Option<Decimal> {
        self.monthly_price_by_term.get(&term).copied().filter(|price| *price > Decimal::ZERO)
    }

    pub fn available_terms(&self) -> Vec<ContractTerm> {
        ContractTerm::ALL.into_iter().filter(|term| self.monthly_price(*term).is_some()).collect()
    }

    /// Internal cost basis used for markup and margin.
    pub fn base_cost(&self) -> Decimal {
        self.operating_base_cost + self.auxiliary_equipment_cost.unwrap_or(Decimal::ZERO)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionFlags {
    #[serde(default)]
    pub include_installation: bool,
}
