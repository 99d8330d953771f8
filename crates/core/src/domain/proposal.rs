use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cpq::discount::DiscountState;
use crate::cpq::pricing::{price_line_item, LinePrice};
use crate::domain::family::ProductFamily;
use crate::domain::plan::{OptionFlags, Plan};
use crate::domain::term::ContractTerm;
use crate::errors::{DomainError, ValidationError};

/// Composite id of one persisted version: `{base_id}_v{version}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProposalId(pub String);

/// Lineage id shared by every version of a proposal: `{prefix}{seq:04}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BaseId(pub String);

impl BaseId {
    /// Highest sequence that still fits the 4-digit id format.
    pub const MAX_SEQUENCE: u32 = 9_999;

    pub fn mint(prefix: &str, sequence: u32) -> Result<Self, DomainError> {
        if sequence == 0 || sequence > Self::MAX_SEQUENCE {
            return Err(DomainError::SequenceExhausted { prefix: prefix.to_string(), sequence });
        }
        Ok(Self(format!("{prefix}{sequence:04}")))
    }

    /// Numeric suffix under `prefix`, if this id belongs to it.
    pub fn sequence(&self, prefix: &str) -> Option<u32> {
        let digits = self.0.strip_prefix(prefix)?;
        if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    pub fn version_id(&self, version: u32) -> ProposalId {
        ProposalId(format!("{}_v{version}", self.0))
    }
}

impl ProposalId {
    pub fn split(&self) -> Option<(BaseId, u32)> {
        let (base, version) = self.0.rsplit_once("_v")?;
        let version = version.parse().ok()?;
        Some((BaseId(base.to_string()), version))
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for BaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical client record. Older records stored the client as a bare name
/// string; both shapes deserialize through [`ClientRef`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ClientRef")]
pub struct Client {
    pub name: String,
    pub document: Option<String>,
    pub contact: Option<String>,
}

impl Client {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), document: None, contact: None }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ClientRef {
    Named {
        name: String,
        #[serde(default, alias = "cnpj")]
        document: Option<String>,
        #[serde(default)]
        contact: Option<String>,
    },
    Legacy(String),
}

impl ClientRef {
    pub fn normalize(self) -> Client {
        let non_blank =
            |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        match self {
            Self::Named { name, document, contact } => Client {
                name: name.trim().to_string(),
                document: non_blank(document),
                contact: non_blank(contact),
            },
            Self::Legacy(name) => Client::named(name.trim()),
        }
    }
}

impl From<ClientRef> for Client {
    fn from(value: ClientRef) -> Self {
        value.normalize()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItemId(pub Uuid);

impl LineItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LineItemId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRef {
    pub family: ProductFamily,
    pub capacity_tier: u32,
}

/// Snapshot of every input that produced a line item's prices, enough to
/// rebuild the calculation when a saved proposal is reopened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputationDetails {
    pub family: ProductFamily,
    pub term: ContractTerm,
    pub options: OptionFlags,
    pub plan: Plan,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub plan_ref: PlanRef,
    pub description: String,
    pub setup_amount: Decimal,
    pub monthly_amount: Decimal,
    pub computation_details: ComputationDetails,
}

impl LineItem {
    /// Wraps an already computed price with the snapshot that produced it.
    pub fn new(
        family: ProductFamily,
        plan: &Plan,
        term: ContractTerm,
        options: OptionFlags,
        price: LinePrice,
    ) -> Self {
        let installation =
            if options.include_installation { "com instalação" } else { "sem instalação" };

        Self {
            id: LineItemId::new(),
            plan_ref: PlanRef { family, capacity_tier: plan.capacity_tier },
            description: format!(
                "{} {} - {} ({installation})",
                family.display_name(),
                plan.display_label,
                term
            ),
            setup_amount: price.setup_amount,
            monthly_amount: price.monthly_amount,
            computation_details: ComputationDetails { family, term, options, plan: plan.clone() },
        }
    }

    pub fn price(
        family: ProductFamily,
        plan: &Plan,
        term: ContractTerm,
        options: OptionFlags,
    ) -> Result<Self, ValidationError> {
        let price = price_line_item(plan, term, options)?;
        Ok(Self::new(family, plan, term, options, price))
    }

    /// Re-runs the pricing engine over the stored snapshot.
    pub fn reprice(&self) -> Result<LinePrice, ValidationError> {
        let details = &self.computation_details;
        price_line_item(&details.plan, details.term, details.options)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalTerms {
    pub contract_term: ContractTerm,
    pub discounts: DiscountState,
    pub referral_partner: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalAggregate {
    pub id: ProposalId,
    pub base_id: BaseId,
    pub version: u32,
    pub family: ProductFamily,
    pub client: Client,
    pub account_manager: String,
    pub terms: ProposalTerms,
    pub line_items: Vec<LineItem>,
    pub raw_total_setup: Decimal,
    pub raw_total_monthly: Decimal,
    pub total_setup: Decimal,
    pub total_monthly: Decimal,
    pub referral_commission: Decimal,
    pub created_at: DateTime<Utc>,
    pub owner_id: String,
}
