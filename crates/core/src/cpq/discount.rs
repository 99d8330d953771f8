use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cpq::commission::PartnerCommissionTable;
use crate::domain::actor::Actor;
use crate::domain::term::ContractTerm;
use crate::errors::{DomainError, ValidationError};
use crate::money::{discount_factor, percent_of};

/// Fixed percentage granted by the salesperson toggle.
pub const SALESPERSON_DISCOUNT_PCT: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountState {
    #[serde(default)]
    pub salesperson_discount_enabled: bool,
    #[serde(default)]
    pub director_discount_percent: Decimal,
}

impl DiscountState {
    /// Builds a discount state on behalf of `actor`. Only actors allowed to
    /// grant director discounts may set a non-zero director percentage.
    pub fn for_actor(
        actor: &Actor,
        salesperson_discount_enabled: bool,
        director_discount_percent: Decimal,
    ) -> Result<Self, DomainError> {
        let state = Self { salesperson_discount_enabled, director_discount_percent };
        state.validate()?;
        if director_discount_percent > Decimal::ZERO {
            actor.require(actor.permissions.can_set_director_discount, "set a director discount")?;
        }
        Ok(state)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let pct = self.director_discount_percent;
        if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
            return Err(ValidationError::DiscountOutOfRange(pct));
        }
        Ok(())
    }

    pub fn salesperson_factor(&self) -> Decimal {
        if self.salesperson_discount_enabled {
            discount_factor(SALESPERSON_DISCOUNT_PCT)
        } else {
            Decimal::ONE
        }
    }

    pub fn director_factor(&self) -> Decimal {
        discount_factor(self.director_discount_percent)
    }

    /// Salesperson discount first, then director discount, multiplicatively.
    pub fn apply(&self, amount: Decimal) -> Decimal {
        amount * self.salesperson_factor() * self.director_factor()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountOutcome {
    pub discounted_setup: Decimal,
    pub discounted_monthly: Decimal,
    pub referral_rate_pct: Decimal,
    pub referral_commission: Decimal,
    pub final_setup: Decimal,
    pub final_monthly: Decimal,
}

/// Applies salesperson and director discounts to raw totals, then deducts the
/// referral-partner commission from the discounted monthly total. The
/// commission tier is chosen on discounted revenue and never touches setup.
pub fn apply_discounts(
    raw_total_setup: Decimal,
    raw_total_monthly: Decimal,
    discounts: &DiscountState,
    commission_table: &PartnerCommissionTable,
    term: ContractTerm,
    referral_enabled: bool,
) -> Result<DiscountOutcome, ValidationError> {
    discounts.validate()?;

    let discounted_setup = discounts.apply(raw_total_setup);
    let discounted_monthly = discounts.apply(raw_total_monthly);

    let (referral_rate_pct, referral_commission) = if referral_enabled {
        let rate = commission_table.rate_for(discounted_monthly, term);
        (rate, percent_of(discounted_monthly, rate))
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };

    Ok(DiscountOutcome {
        discounted_setup,
        discounted_monthly,
        referral_rate_pct,
        referral_commission,
        final_setup: discounted_setup,
        final_monthly: discounted_monthly - referral_commission,
    })
}
