use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cpq::discount::DiscountState;
use crate::cpq::pricing::PricingEngine;
use crate::cpq::profile::FamilyProfile;
use crate::cpq::QuoteRuntime;
use crate::domain::actor::Actor;
use crate::domain::family::ProductFamily;
use crate::domain::plan::OptionFlags;
use crate::domain::proposal::{
    BaseId, Client, LineItem, LineItemId, ProposalAggregate, ProposalTerms,
};
use crate::domain::term::ContractTerm;
use crate::errors::{DomainError, ValidationError};

/// In-memory proposal being edited. Nothing here is persisted until
/// [`crate::proposal::ProposalService::save`] succeeds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDraft {
    pub family: ProductFamily,
    #[serde(default)]
    pub client: Client,
    #[serde(default)]
    pub account_manager: String,
    pub owner_id: String,
    pub contract_term: ContractTerm,
    #[serde(default)]
    pub discounts: DiscountState,
    #[serde(default)]
    pub referral_partner: bool,
    #[serde(default)]
    line_items: Vec<LineItem>,
    /// Lineage this draft continues, when it was resumed from a saved version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_id: Option<BaseId>,
}

impl ProposalDraft {
    pub fn new(family: ProductFamily, owner_id: impl Into<String>, contract_term: ContractTerm) -> Self {
        Self {
            family,
            client: Client::default(),
            account_manager: String::new(),
            owner_id: owner_id.into(),
            contract_term,
            discounts: DiscountState::default(),
            referral_partner: false,
            line_items: Vec::new(),
            base_id: None,
        }
    }

    /// Reopens a persisted version for editing. Saving the result appends a
    /// new version to the same lineage.
    pub fn resume(proposal: ProposalAggregate) -> Self {
        Self {
            family: proposal.family,
            client: proposal.client,
            account_manager: proposal.account_manager,
            owner_id: proposal.owner_id,
            contract_term: proposal.terms.contract_term,
            discounts: proposal.terms.discounts,
            referral_partner: proposal.terms.referral_partner,
            line_items: proposal.line_items,
            base_id: Some(proposal.base_id),
        }
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn terms(&self) -> ProposalTerms {
        ProposalTerms {
            contract_term: self.contract_term,
            discounts: self.discounts.clone(),
            referral_partner: self.referral_partner,
        }
    }

    pub fn add_line_item(&mut self, item: LineItem) -> Result<LineItemId, DomainError> {
        if item.plan_ref.family != self.family {
            return Err(DomainError::InvariantViolation(format!(
                "cannot add a {} line item to a {} proposal",
                item.plan_ref.family, self.family
            )));
        }
        if item.computation_details.term != self.contract_term {
            return Err(DomainError::InvariantViolation(format!(
                "line item priced for {} but the proposal term is {}",
                item.computation_details.term, self.contract_term
            )));
        }

        let id = item.id;
        self.line_items.push(item);
        Ok(id)
    }

    pub fn add_plan<P: PricingEngine>(
        &mut self,
        runtime: &QuoteRuntime<P>,
        profile: &FamilyProfile,
        capacity_tier: u32,
        options: OptionFlags,
    ) -> Result<LineItemId, DomainError> {
        let item = runtime.price_line(profile, capacity_tier, self.contract_term, options)?;
        self.add_line_item(item)
    }

    pub fn remove_line_item(&mut self, id: LineItemId) -> Option<LineItem> {
        let index = self.line_items.iter().position(|item| item.id == id)?;
        Some(self.line_items.remove(index))
    }

    /// Switches the contract term and re-prices every line item from its
    /// stored plan snapshot. Leaves the draft untouched if any plan is not
    /// sold on the new term.
    pub fn change_term(&mut self, term: ContractTerm) -> Result<(), ValidationError> {
        let repriced = self
            .line_items
            .iter()
            .map(|item| {
                let details = &item.computation_details;
                LineItem::price(details.family, &details.plan, term, details.options)
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.contract_term = term;
        self.line_items = repriced;
        Ok(())
    }

    pub fn set_discounts(
        &mut self,
        actor: &Actor,
        salesperson_discount_enabled: bool,
        director_discount_percent: Decimal,
    ) -> Result<(), DomainError> {
        self.discounts =
            DiscountState::for_actor(actor, salesperson_discount_enabled, director_discount_percent)?;
        Ok(())
    }

    pub fn raw_total_setup(&self) -> Decimal {
        self.line_items.iter().map(|item| item.setup_amount).sum()
    }

    pub fn raw_total_monthly(&self) -> Decimal {
        self.line_items.iter().map(|item| item.monthly_amount).sum()
    }

    /// Hard preconditions for persisting.
    pub fn validate_for_save(&self) -> Result<(), ValidationError> {
        if self.client.name.trim().is_empty() {
            return Err(ValidationError::EmptyClientName);
        }
        if self.line_items.is_empty() {
            return Err(ValidationError::EmptyLineItems);
        }
        self.discounts.validate()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::ProposalDraft;
    use crate::cpq::profile::FamilyProfile;
    use crate::cpq::QuoteRuntime;
    use crate::domain::actor::{Actor, Role};
    use crate::domain::family::ProductFamily;
    use crate::domain::plan::OptionFlags;
    use crate::domain::proposal::Client;
    use crate::domain::term::ContractTerm;
    use crate::errors::{DomainError, ValidationError};

    fn radio_draft() -> (ProposalDraft, FamilyProfile, QuoteRuntime) {
        let draft = ProposalDraft::new(ProductFamily::Radio, "user-1", ContractTerm::Months12);
        (draft, FamilyProfile::default_for(ProductFamily::Radio), QuoteRuntime::default())
    }

    #[test]
    fn add_and_remove_line_items() {
        let (mut draft, profile, runtime) = radio_draft();
        let first = draft
            .add_plan(&runtime, &profile, 20, OptionFlags { include_installation: true })
            .expect("add 20 Mbps");
        draft.add_plan(&runtime, &profile, 10, OptionFlags::default()).expect("add 10 Mbps");

        assert_eq!(draft.raw_total_monthly(), Decimal::new(120_000, 2));
        assert_eq!(draft.raw_total_setup(), Decimal::new(99_800, 2));

        let removed = draft.remove_line_item(first).expect("remove");
        assert_eq!(removed.plan_ref.capacity_tier, 20);
        assert_eq!(draft.line_items().len(), 1);
        assert!(draft.remove_line_item(first).is_none());
    }

    #[test]
    fn rejects_line_items_from_another_family() {
        let (mut draft, _, runtime) = radio_draft();
        let fiber = FamilyProfile::default_for(ProductFamily::Fiber);
        assert!(matches!(
            draft.add_plan(&runtime, &fiber, 100, OptionFlags::default()),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn change_term_reprices_or_leaves_draft_untouched() {
        let (mut draft, profile, runtime) = radio_draft();
        draft.add_plan(&runtime, &profile, 20, OptionFlags::default()).expect("add");

        draft.change_term(ContractTerm::Months36).expect("36 months available");
        assert_eq!(draft.raw_total_monthly(), Decimal::new(59_000, 2));

        let mut long_only = ProposalDraft::new(ProductFamily::Radio, "user-1", ContractTerm::Months36);
        long_only.add_plan(&runtime, &profile, 100, OptionFlags::default()).expect("add");
        let before = long_only.clone();
        assert!(matches!(
            long_only.change_term(ContractTerm::Months12),
            Err(ValidationError::UnavailableTerm { .. })
        ));
        assert_eq!(long_only, before);
    }

    #[test]
    fn save_preconditions_are_hard_failures() {
        let (mut draft, profile, runtime) = radio_draft();
        assert_eq!(draft.validate_for_save(), Err(ValidationError::EmptyClientName));

        draft.client = Client::named("Mercado Boa Vista");
        assert_eq!(draft.validate_for_save(), Err(ValidationError::EmptyLineItems));

        draft.add_plan(&runtime, &profile, 10, OptionFlags::default()).expect("add");
        assert_eq!(draft.validate_for_save(), Ok(()));
    }

    #[test]
    fn discounts_are_role_gated() {
        let (mut draft, _, _) = radio_draft();
        let seller = Actor::new("user-1", Role::Usuario);
        assert!(draft.set_discounts(&seller, true, Decimal::ZERO).is_ok());
        assert!(draft.set_discounts(&seller, true, Decimal::new(10, 0)).is_err());
        assert!(draft.discounts.salesperson_discount_enabled);
        assert_eq!(draft.discounts.director_discount_percent, Decimal::ZERO);

        let director = Actor::new("dir-1", Role::Diretor);
        draft.set_discounts(&director, false, Decimal::new(10, 0)).expect("director discount");
        assert_eq!(draft.discounts.director_discount_percent, Decimal::new(10, 0));
    }
}
