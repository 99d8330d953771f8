use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::term::ContractTerm;
use crate::errors::ValidationError;

/// Named threshold sets. Links use `standard`; circuit families with heavier
/// installation use `extended`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaybackVariant {
    Standard,
    Extended,
}

impl PaybackVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Extended => "extended",
        }
    }

    pub fn table(self) -> PaybackTable {
        match self {
            Self::Standard => PaybackTable { max_months: [8, 10, 11, 13, 14] },
            Self::Extended => PaybackTable { max_months: [8, 10, 12, 14, 16] },
        }
    }
}

impl FromStr for PaybackVariant {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "extended" => Ok(Self::Extended),
            other => {
                Err(format!("unsupported payback variant `{other}` (expected standard|extended)"))
            }
        }
    }
}

/// Maximum acceptable payback, in months, for every offered contract term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<ContractTerm, u32>", into = "BTreeMap<ContractTerm, u32>")]
pub struct PaybackTable {
    max_months: [u32; 5],
}

impl PaybackTable {
    pub fn new(thresholds: BTreeMap<ContractTerm, u32>) -> Result<Self, ValidationError> {
        let mut max_months = [0; 5];
        for term in ContractTerm::ALL {
            let months = thresholds.get(&term).copied().ok_or_else(|| {
                ValidationError::PaybackTable(format!("missing threshold for {term}"))
            })?;
            if months == 0 {
                return Err(ValidationError::PaybackTable(format!(
                    "threshold for {term} must be positive"
                )));
            }
            max_months[term.index()] = months;
        }
        Ok(Self { max_months })
    }

    pub fn max_payback_months(&self, term: ContractTerm) -> u32 {
        self.max_months[term.index()]
    }

    /// Advisory check: an invalid payback is surfaced to the user but does not
    /// block saving.
    pub fn validate(
        &self,
        installation_cost: Decimal,
        monthly_revenue: Decimal,
        term: ContractTerm,
    ) -> PaybackAssessment {
        let actual_payback = compute_payback_months(installation_cost, monthly_revenue);
        let max_payback = self.max_payback_months(term);
        PaybackAssessment { is_valid: actual_payback <= max_payback, actual_payback, max_payback }
    }
}

impl Default for PaybackTable {
    fn default() -> Self {
        PaybackVariant::Standard.table()
    }
}

impl TryFrom<BTreeMap<ContractTerm, u32>> for PaybackTable {
    type Error = ValidationError;

    fn try_from(thresholds: BTreeMap<ContractTerm, u32>) -> Result<Self, Self::Error> {
        Self::new(thresholds)
    }
}

impl From<PaybackTable> for BTreeMap<ContractTerm, u32> {
    fn from(table: PaybackTable) -> Self {
        ContractTerm::ALL.into_iter().map(|term| (term, table.max_payback_months(term))).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaybackAssessment {
    pub is_valid: bool,
    pub actual_payback: u32,
    pub max_payback: u32,
}

/// Months of revenue needed to recover `installation_cost`, rounded up.
/// Zero revenue is defined as zero months rather than an error.
pub fn compute_payback_months(installation_cost: Decimal, monthly_revenue: Decimal) -> u32 {
    if monthly_revenue <= Decimal::ZERO || installation_cost <= Decimal::ZERO {
        return 0;
    }
    (installation_cost / monthly_revenue).ceil().to_u32().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use super::{compute_payback_months, PaybackTable, PaybackVariant};
    use crate::domain::term::ContractTerm;
    use crate::errors::ValidationError;

    #[test]
    fn standard_and_extended_thresholds() {
        let standard = PaybackVariant::Standard.table();
        let extended = PaybackVariant::Extended.table();
        let expected = [(12, 8, 8), (24, 10, 10), (36, 11, 12), (48, 13, 14), (60, 14, 16)];
        for (months, std_max, ext_max) in expected {
            let term = ContractTerm::try_from(months).expect("term");
            assert_eq!(standard.max_payback_months(term), std_max);
            assert_eq!(extended.max_payback_months(term), ext_max);
        }
    }

    #[test]
    fn payback_rounds_up_and_defines_zero_cases() {
        assert_eq!(compute_payback_months(Decimal::new(998, 0), Decimal::new(720, 0)), 2);
        assert_eq!(compute_payback_months(Decimal::new(1440, 0), Decimal::new(720, 0)), 2);
        assert_eq!(compute_payback_months(Decimal::ZERO, Decimal::new(720, 0)), 0);
        assert_eq!(compute_payback_months(Decimal::new(998, 0), Decimal::ZERO), 0);
        assert_eq!(compute_payback_months(Decimal::new(998, 0), Decimal::new(-5, 0)), 0);
    }

    #[test]
    fn validation_compares_against_term_threshold() {
        let table = PaybackTable::default();
        let ok = table.validate(Decimal::new(998, 0), Decimal::new(720, 0), ContractTerm::Months12);
        assert!(ok.is_valid);
        assert_eq!((ok.actual_payback, ok.max_payback), (2, 8));

        let slow = table.validate(Decimal::new(9_000, 0), Decimal::new(720, 0), ContractTerm::Months12);
        assert!(!slow.is_valid);
        assert_eq!(slow.actual_payback, 13);
    }

    #[test]
    fn custom_tables_must_cover_every_term() {
        let mut partial = BTreeMap::new();
        partial.insert(ContractTerm::Months12, 6);
        assert!(matches!(PaybackTable::new(partial), Err(ValidationError::PaybackTable(_))));

        let json = serde_json::to_string(&PaybackVariant::Extended.table()).expect("serialize");
        assert_eq!(json, r#"{"12":8,"24":10,"36":12,"48":14,"60":16}"#);
        let back: PaybackTable = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, PaybackVariant::Extended.table());
    }
}
