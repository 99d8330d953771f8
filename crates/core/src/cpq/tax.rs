use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Flat, illustrative tax percentages. Stored per user as a preference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxConfig {
    pub pis: Decimal,
    pub cofins: Decimal,
    pub csll: Decimal,
    pub irpj: Decimal,
    #[serde(default = "default_iss")]
    pub iss: Decimal,
}

fn default_iss() -> Decimal {
    Decimal::new(500, 2)
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self {
            pis: Decimal::new(65, 2),
            cofins: Decimal::new(300, 2),
            csll: Decimal::new(900, 2),
            irpj: Decimal::new(1500, 2),
            iss: default_iss(),
        }
    }
}

impl TaxConfig {
    pub fn rate(&self, kind: TaxKind) -> Decimal {
        match kind {
            TaxKind::Pis => self.pis,
            TaxKind::Cofins => self.cofins,
            TaxKind::Csll => self.csll,
            TaxKind::Irpj => self.irpj,
            TaxKind::Iss => self.iss,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for kind in TaxKind::ALL {
            let value = self.rate(kind);
            if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                return Err(ValidationError::InvalidPercentage { field: kind.as_str(), value });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxKind {
    Pis,
    Cofins,
    Csll,
    Irpj,
    Iss,
}

impl TaxKind {
    pub const ALL: [TaxKind; 5] =
        [TaxKind::Pis, TaxKind::Cofins, TaxKind::Csll, TaxKind::Irpj, TaxKind::Iss];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pis => "pis",
            Self::Cofins => "cofins",
            Self::Csll => "csll",
            Self::Irpj => "irpj",
            Self::Iss => "iss",
        }
    }
}

/// Which taxes are charged on revenue and which on profit for a product
/// family.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxClasses {
    pub revenue: Vec<TaxKind>,
    pub profit: Vec<TaxKind>,
}

impl TaxClasses {
    /// Connectivity links: PIS + COFINS on revenue.
    pub fn telecom() -> Self {
        Self { revenue: vec![TaxKind::Pis, TaxKind::Cofins], profit: vec![TaxKind::Csll, TaxKind::Irpj] }
    }

    /// Hosted services also pay ISS on revenue.
    pub fn services() -> Self {
        Self {
            revenue: vec![TaxKind::Pis, TaxKind::Cofins, TaxKind::Iss],
            profit: vec![TaxKind::Csll, TaxKind::Irpj],
        }
    }

    pub fn revenue_rate(&self, config: &TaxConfig) -> Decimal {
        self.revenue.iter().map(|kind| config.rate(*kind)).sum()
    }

    pub fn profit_rate(&self, config: &TaxConfig) -> Decimal {
        self.profit.iter().map(|kind| config.rate(*kind)).sum()
    }
}
