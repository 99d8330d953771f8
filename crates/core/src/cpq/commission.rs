//! Referral-partner commission tiers.
//!
//! Tier bounds are inclusive on both ends and adjoining tiers are one cent
//! apart (`0.00..=500.00`, `500.01..=1000.00`, ...). Revenue is rounded to
//! cents before lookup so every non-negative value lands in exactly one tier.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::term::ContractTerm;
use crate::errors::ValidationError;
use crate::money::{percent_of, round_money};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionTier {
    pub min_revenue: Decimal,
    /// `None` for the last, unbounded tier.
    pub max_revenue: Option<Decimal>,
    pub rate_pct_up_to_term_24: Decimal,
    pub rate_pct_over_term_24: Decimal,
}

impl CommissionTier {
    pub fn contains(&self, revenue: Decimal) -> bool {
        revenue >= self.min_revenue && self.max_revenue.map_or(true, |max| revenue <= max)
    }

    pub fn rate_for_term(&self, term: ContractTerm) -> Decimal {
        if term.is_up_to_24_months() {
            self.rate_pct_up_to_term_24
        } else {
            self.rate_pct_over_term_24
        }
    }
}

/// `(min, max, rate <= 24 months, rate > 24 months)` in cents / basis points.
const PARTNER_INDICATOR_RANGES: [(i64, Option<i64>, i64, i64); 8] = [
    (0, Some(50_000), 150, 200),
    (50_001, Some(100_000), 250, 300),
    (100_001, Some(150_000), 400, 500),
    (150_001, Some(300_000), 550, 650),
    (300_001, Some(500_000), 700, 800),
    (500_001, Some(650_000), 800, 950),
    (650_001, Some(900_000), 900, 1100),
    (900_001, None, 1000, 1200),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CommissionTier>", into = "Vec<CommissionTier>")]
pub struct PartnerCommissionTable {
    tiers: Vec<CommissionTier>,
}

impl PartnerCommissionTable {
    /// Builds a table after checking that the tiers partition `[0, ∞)` at
    /// cent resolution with no gaps or overlaps.
    pub fn new(tiers: Vec<CommissionTier>) -> Result<Self, ValidationError> {
        let cent = Decimal::new(1, 2);
        let Some(first) = tiers.first() else {
            return Err(ValidationError::CommissionTable("table has no tiers".to_string()));
        };
        if first.min_revenue != Decimal::ZERO {
            return Err(ValidationError::CommissionTable(format!(
                "first tier must start at 0, starts at {}",
                first.min_revenue
            )));
        }

        for (index, tier) in tiers.iter().enumerate() {
            if tier.rate_pct_up_to_term_24 < Decimal::ZERO
                || tier.rate_pct_over_term_24 < Decimal::ZERO
            {
                return Err(ValidationError::CommissionTable(format!(
                    "tier {index} has a negative rate"
                )));
            }
            if tier.min_revenue != round_money(tier.min_revenue) {
                return Err(ValidationError::CommissionTable(format!(
                    "tier {index} lower bound is not cent-aligned"
                )));
            }

            let is_last = index + 1 == tiers.len();
            match (tier.max_revenue, is_last) {
                (None, true) => {}
                (None, false) => {
                    return Err(ValidationError::CommissionTable(format!(
                        "tier {index} is unbounded but is not the last tier"
                    )));
                }
                (Some(_), true) => {
                    return Err(ValidationError::CommissionTable(
                        "last tier must be unbounded".to_string(),
                    ));
                }
                (Some(max), false) => {
                    if max < tier.min_revenue {
                        return Err(ValidationError::CommissionTable(format!(
                            "tier {index} upper bound is below its lower bound"
                        )));
                    }
                    let next_min = tiers[index + 1].min_revenue;
                    if next_min != max + cent {
                        return Err(ValidationError::CommissionTable(format!(
                            "tier {} must start one cent after {max}, starts at {next_min}",
                            index + 1
                        )));
                    }
                }
            }
        }

        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[CommissionTier] {
        &self.tiers
    }

    pub fn lookup(&self, monthly_revenue: Decimal) -> Option<&CommissionTier> {
        let revenue = round_money(monthly_revenue);
        self.tiers.iter().find(|tier| tier.contains(revenue))
    }

    /// Commission percentage for a monthly revenue and term. Returns zero when
    /// no tier matches, which only happens for negative revenue.
    pub fn rate_for(&self, monthly_revenue: Decimal, term: ContractTerm) -> Decimal {
        match self.lookup(monthly_revenue) {
            Some(tier) => tier.rate_for_term(term),
            None => {
                warn!(
                    event_name = "cpq.commission.tier_miss",
                    monthly_revenue = %monthly_revenue,
                    term_months = term.months(),
                    "no partner commission tier matched; falling back to zero"
                );
                Decimal::ZERO
            }
        }
    }

    pub fn commission_on(&self, monthly_revenue: Decimal, term: ContractTerm) -> Decimal {
        percent_of(monthly_revenue, self.rate_for(monthly_revenue, term))
    }
}

impl Default for PartnerCommissionTable {
    fn default() -> Self {
        let tiers = PARTNER_INDICATOR_RANGES
            .iter()
            .map(|&(min, max, up_to_24, over_24)| CommissionTier {
                min_revenue: Decimal::new(min, 2),
                max_revenue: max.map(|max| Decimal::new(max, 2)),
                rate_pct_up_to_term_24: Decimal::new(up_to_24, 2),
                rate_pct_over_term_24: Decimal::new(over_24, 2),
            })
            .collect();
        Self { tiers }
    }
}

impl TryFrom<Vec<CommissionTier>> for PartnerCommissionTable {
    type Error = ValidationError;

    fn try_from(tiers: Vec<CommissionTier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<PartnerCommissionTable> for Vec<CommissionTier> {
    fn from(table: PartnerCommissionTable) -> Self {
        table.tiers
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{CommissionTier, PartnerCommissionTable};
    use crate::domain::term::ContractTerm;
    use crate::errors::ValidationError;

    #[test]
    fn default_table_is_a_valid_partition() {
        let table = PartnerCommissionTable::default();
        assert_eq!(PartnerCommissionTable::new(table.tiers().to_vec()), Ok(table));
    }

    #[test]
    fn cent_boundaries_resolve_to_adjacent_tiers() {
        let table = PartnerCommissionTable::default();
        assert_eq!(
            table.rate_for(Decimal::new(50_000, 2), ContractTerm::Months12),
            Decimal::new(15, 1)
        );
        assert_eq!(
            table.rate_for(Decimal::new(50_001, 2), ContractTerm::Months12),
            Decimal::new(25, 1)
        );
        assert_ne!(table.lookup(Decimal::new(50_000, 2)), table.lookup(Decimal::new(50_001, 2)));
    }

    #[test]
    fn every_cent_value_matches_exactly_one_tier() {
        let table = PartnerCommissionTable::default();
        let samples = [0, 1, 49_999, 50_000, 50_001, 100_000, 100_001, 899_999, 900_000, 900_001]
            .into_iter()
            .chain((0..2_000_000).step_by(997));
        for cents in samples {
            let revenue = Decimal::new(cents, 2);
            let matches = table.tiers().iter().filter(|tier| tier.contains(revenue)).count();
            assert_eq!(matches, 1, "revenue {revenue} matched {matches} tiers");
        }
    }

    #[test]
    fn sub_cent_revenue_rounds_before_lookup() {
        let table = PartnerCommissionTable::default();
        assert_eq!(
            table.rate_for(Decimal::new(5_000_049, 4), ContractTerm::Months24),
            Decimal::new(15, 1)
        );
        assert_eq!(
            table.rate_for(Decimal::new(5_000_050, 4), ContractTerm::Months24),
            Decimal::new(25, 1)
        );
    }

    #[test]
    fn long_terms_use_the_over_24_rate() {
        let table = PartnerCommissionTable::default();
        let revenue = Decimal::new(72_000, 2);
        assert_eq!(table.rate_for(revenue, ContractTerm::Months24), Decimal::new(25, 1));
        assert_eq!(table.rate_for(revenue, ContractTerm::Months36), Decimal::new(3, 0));
        assert_eq!(table.commission_on(revenue, ContractTerm::Months36), Decimal::new(2160, 2));
    }

    #[test]
    fn negative_revenue_falls_back_to_zero() {
        let table = PartnerCommissionTable::default();
        assert_eq!(table.rate_for(Decimal::new(-1, 0), ContractTerm::Months12), Decimal::ZERO);
    }

    #[test]
    fn rejects_gaps_and_overlaps() {
        let tier = |min: i64, max: Option<i64>| CommissionTier {
            min_revenue: Decimal::new(min, 2),
            max_revenue: max.map(|m| Decimal::new(m, 2)),
            rate_pct_up_to_term_24: Decimal::ONE,
            rate_pct_over_term_24: Decimal::ONE,
        };

        let gap = PartnerCommissionTable::new(vec![tier(0, Some(50_000)), tier(50_100, None)]);
        assert!(matches!(gap, Err(ValidationError::CommissionTable(_))));

        let overlap = PartnerCommissionTable::new(vec![tier(0, Some(50_000)), tier(50_000, None)]);
        assert!(matches!(overlap, Err(ValidationError::CommissionTable(_))));

        let bounded_last = PartnerCommissionTable::new(vec![tier(0, Some(50_000))]);
        assert!(matches!(bounded_last, Err(ValidationError::CommissionTable(_))));

        let json = r#"[{"min_revenue":"10","max_revenue":null,"rate_pct_up_to_term_24":"1","rate_pct_over_term_24":"1"}]"#;
        assert!(serde_json::from_str::<PartnerCommissionTable>(json).is_err());
    }
}
