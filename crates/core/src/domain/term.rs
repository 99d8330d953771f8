use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Contract terms offered to customers. Any other month count is rejected at
/// the parsing boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ContractTerm {
    Months12,
    Months24,
    Months36,
    Months48,
    Months60,
}

impl ContractTerm {
    pub const ALL: [ContractTerm; 5] = [
        ContractTerm::Months12,
        ContractTerm::Months24,
        ContractTerm::Months36,
        ContractTerm::Months48,
        ContractTerm::Months60,
    ];

    pub fn months(self) -> u32 {
        match self {
            Self::Months12 => 12,
            Self::Months24 => 24,
            Self::Months36 => 36,
            Self::Months48 => 48,
            Self::Months60 => 60,
        }
    }

    /// Partner commission tiers pay a different rate up to 24 months.
    pub fn is_up_to_24_months(self) -> bool {
        self.months() <= 24
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Months12 => 0,
            Self::Months24 => 1,
            Self::Months36 => 2,
            Self::Months48 => 3,
            Self::Months60 => 4,
        }
    }
}

impl TryFrom<u32> for ContractTerm {
    type Error = ValidationError;

    fn try_from(months: u32) -> Result<Self, Self::Error> {
        match months {
            12 => Ok(Self::Months12),
            24 => Ok(Self::Months24),
            36 => Ok(Self::Months36),
            48 => Ok(Self::Months48),
            60 => Ok(Self::Months60),
            other => Err(ValidationError::UnsupportedTerm(other)),
        }
    }
}

impl From<ContractTerm> for u32 {
    fn from(term: ContractTerm) -> Self {
        term.months()
    }
}

impl FromStr for ContractTerm {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim().trim_end_matches('m');
        let months = trimmed
            .parse::<u32>()
            .map_err(|_| ValidationError::UnparseableTerm(value.trim().to_string()))?;
        Self::try_from(months)
    }
}

impl fmt::Display for ContractTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} meses", self.months())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::ContractTerm;
    use crate::errors::ValidationError;

    #[test]
    fn parses_offered_terms_only() {
        assert_eq!("36".parse::<ContractTerm>(), Ok(ContractTerm::Months36));
        assert_eq!("60m".parse::<ContractTerm>(), Ok(ContractTerm::Months60));
        assert_eq!(ContractTerm::try_from(18), Err(ValidationError::UnsupportedTerm(18)));
        assert_eq!("18".parse::<ContractTerm>(), Err(ValidationError::UnsupportedTerm(18)));
    }

    #[test]
    fn non_numeric_terms_report_the_raw_input() {
        let error = " doze ".parse::<ContractTerm>().expect_err("not a term");
        assert_eq!(error, ValidationError::UnparseableTerm("doze".to_string()));
        assert!(error.to_string().contains("`doze`"));
        assert!(!error.to_string().contains("0 months"));
    }

    #[test]
    fn twenty_four_months_is_still_the_short_bucket() {
        assert!(ContractTerm::Months24.is_up_to_24_months());
        assert!(!ContractTerm::Months36.is_up_to_24_months());
    }

    #[test]
    fn serializes_as_month_count_even_as_map_key() {
        let mut prices = BTreeMap::new();
        prices.insert(ContractTerm::Months12, 1);
        let json = serde_json::to_string(&prices).expect("serialize");
        assert_eq!(json, r#"{"12":1}"#);

        let back: BTreeMap<ContractTerm, u32> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, prices);
        assert!(serde_json::from_str::<ContractTerm>("18").is_err());
    }
}
