//! Simplified income-statement projection (DRE) for a priced offer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cpq::commission::PartnerCommissionTable;
use crate::cpq::discount::DiscountState;
use crate::cpq::tax::{TaxClasses, TaxConfig};
use crate::domain::term::ContractTerm;
use crate::errors::ValidationError;
use crate::money::percent_of;

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

#[derive(Clone, Debug)]
pub struct DreInput<'a> {
    pub base_cost: Decimal,
    pub markup_pct: Decimal,
    pub commission_pct: Decimal,
    pub tax_config: &'a TaxConfig,
    pub tax_classes: &'a TaxClasses,
    pub discounts: &'a DiscountState,
    pub referral_enabled: bool,
    pub contract_term: ContractTerm,
}

/// Every step of the projection. Values are signed: a loss shows up as a
/// negative gross profit so profit taxes can be skipped. Use
/// [`CostBreakdown::for_display`] before rendering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub base_cost: Decimal,
    pub markup_amount: Decimal,
    pub price_with_markup: Decimal,
    pub final_price: Decimal,
    pub commission_value: Decimal,
    pub revenue_tax_value: Decimal,
    pub referral_partner_commission: Decimal,
    pub gross_profit: Decimal,
    pub profit_tax_value: Decimal,
    pub net_profit: Decimal,
    pub net_margin: Decimal,
    pub annual_revenue: Decimal,
    pub annual_net_profit: Decimal,
    pub contract_revenue: Decimal,
}

impl CostBreakdown {
    /// Monetary fields floored at zero. Margin stays signed.
    pub fn for_display(&self) -> Self {
        let floor = |value: Decimal| value.max(Decimal::ZERO);
        Self {
            base_cost: floor(self.base_cost),
            markup_amount: floor(self.markup_amount),
            price_with_markup: floor(self.price_with_markup),
            final_price: floor(self.final_price),
            commission_value: floor(self.commission_value),
            revenue_tax_value: floor(self.revenue_tax_value),
            referral_partner_commission: floor(self.referral_partner_commission),
            gross_profit: floor(self.gross_profit),
            profit_tax_value: floor(self.profit_tax_value),
            net_profit: floor(self.net_profit),
            net_margin: self.net_margin,
            annual_revenue: floor(self.annual_revenue),
            annual_net_profit: floor(self.annual_net_profit),
            contract_revenue: floor(self.contract_revenue),
        }
    }
}

pub fn project(
    input: &DreInput<'_>,
    commission_table: &PartnerCommissionTable,
) -> Result<CostBreakdown, ValidationError> {
    input.discounts.validate()?;
    for (field, value) in [("markup_pct", input.markup_pct), ("commission_pct", input.commission_pct)]
    {
        if value < Decimal::ZERO {
            return Err(ValidationError::InvalidPercentage { field, value });
        }
    }

    let base_cost = input.base_cost;
    let markup_amount = percent_of(base_cost, input.markup_pct);
    let price_with_markup = base_cost + markup_amount;
    let final_price = input.discounts.apply(price_with_markup);

    let commission_value = percent_of(final_price, input.commission_pct);
    let revenue_tax_value =
        percent_of(final_price, input.tax_classes.revenue_rate(input.tax_config));
    let referral_partner_commission = if input.referral_enabled {
        commission_table.commission_on(final_price, input.contract_term)
    } else {
        Decimal::ZERO
    };

    let gross_profit = final_price
        - base_cost
        - commission_value
        - revenue_tax_value
        - referral_partner_commission;
    let profit_tax_value = if gross_profit > Decimal::ZERO {
        percent_of(gross_profit, input.tax_classes.profit_rate(input.tax_config))
    } else {
        Decimal::ZERO
    };

    let net_profit = gross_profit - profit_tax_value;
    let net_margin = if final_price > Decimal::ZERO {
        net_profit / final_price * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    Ok(CostBreakdown {
        base_cost,
        markup_amount,
        price_with_markup,
        final_price,
        commission_value,
        revenue_tax_value,
        referral_partner_commission,
        gross_profit,
        profit_tax_value,
        net_profit,
        net_margin,
        annual_revenue: final_price * MONTHS_PER_YEAR,
        annual_net_profit: net_profit * MONTHS_PER_YEAR,
        contract_revenue: final_price * Decimal::from(input.contract_term.months()),
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{project, DreInput};
    use crate::cpq::commission::PartnerCommissionTable;
    use crate::cpq::discount::DiscountState;
    use crate::cpq::tax::{TaxClasses, TaxConfig};
    use crate::domain::term::ContractTerm;

    fn flat_taxes() -> TaxConfig {
        TaxConfig {
            pis: Decimal::new(1, 0),
            cofins: Decimal::new(4, 0),
            csll: Decimal::new(9, 0),
            irpj: Decimal::new(15, 0),
            iss: Decimal::new(5, 0),
        }
    }

    fn input<'a>(
        base_cost: i64,
        markup_pct: i64,
        taxes: &'a TaxConfig,
        classes: &'a TaxClasses,
        discounts: &'a DiscountState,
    ) -> DreInput<'a> {
        DreInput {
            base_cost: Decimal::new(base_cost, 0),
            markup_pct: Decimal::new(markup_pct, 0),
            commission_pct: Decimal::new(5, 0),
            tax_config: taxes,
            tax_classes: classes,
            discounts,
            referral_enabled: false,
            contract_term: ContractTerm::Months12,
        }
    }

    #[test]
    fn projects_the_full_statement_in_order() {
        let taxes = flat_taxes();
        let classes = TaxClasses::telecom();
        let discounts = DiscountState::default();
        let breakdown =
            project(&input(400, 50, &taxes, &classes, &discounts), &PartnerCommissionTable::default())
                .expect("project");

        assert_eq!(breakdown.markup_amount, Decimal::new(200, 0));
        assert_eq!(breakdown.final_price, Decimal::new(600, 0));
        assert_eq!(breakdown.commission_value, Decimal::new(30, 0));
        assert_eq!(breakdown.revenue_tax_value, Decimal::new(30, 0));
        assert_eq!(breakdown.gross_profit, Decimal::new(140, 0));
        assert_eq!(breakdown.profit_tax_value, Decimal::new(336, 1));
        assert_eq!(breakdown.net_profit, Decimal::new(1064, 1));
        assert_eq!(breakdown.net_margin.round_dp(4), Decimal::new(177_333, 4));
        assert_eq!(breakdown.annual_revenue, Decimal::new(7200, 0));
        assert_eq!(breakdown.contract_revenue, Decimal::new(7200, 0));
    }

    #[test]
    fn discounts_and_referral_reduce_profit() {
        let taxes = flat_taxes();
        let classes = TaxClasses::services();
        let discounts = DiscountState {
            salesperson_discount_enabled: true,
            director_discount_percent: Decimal::new(10, 0),
        };
        let mut dre = input(400, 50, &taxes, &classes, &discounts);
        dre.referral_enabled = true;
        dre.contract_term = ContractTerm::Months36;

        let breakdown = project(&dre, &PartnerCommissionTable::default()).expect("project");
        // 600 * 0.95 * 0.90 = 513.00, tier 500.01..=1000 at 3% for 36 months.
        assert_eq!(breakdown.final_price, Decimal::new(51_300, 2));
        assert_eq!(breakdown.referral_partner_commission, Decimal::new(1539, 2));
        assert_eq!(breakdown.revenue_tax_value, Decimal::new(51_300, 3));
    }

    #[test]
    fn losses_pay_no_profit_tax_and_display_floors_at_zero() {
        let taxes = flat_taxes();
        let classes = TaxClasses::telecom();
        let discounts = DiscountState {
            salesperson_discount_enabled: false,
            director_discount_percent: Decimal::new(50, 0),
        };
        let breakdown =
            project(&input(400, 10, &taxes, &classes, &discounts), &PartnerCommissionTable::default())
                .expect("project");

        assert!(breakdown.gross_profit < Decimal::ZERO);
        assert_eq!(breakdown.profit_tax_value, Decimal::ZERO);
        assert_eq!(breakdown.net_profit, breakdown.gross_profit);
        assert!(breakdown.net_margin < Decimal::ZERO);

        let display = breakdown.for_display();
        assert_eq!(display.gross_profit, Decimal::ZERO);
        assert_eq!(display.net_profit, Decimal::ZERO);
        assert_eq!(display.net_margin, breakdown.net_margin);
    }

    #[test]
    fn zero_price_short_circuits_margin() {
        let taxes = flat_taxes();
        let classes = TaxClasses::telecom();
        let discounts = DiscountState {
            salesperson_discount_enabled: false,
            director_discount_percent: Decimal::ONE_HUNDRED,
        };
        let breakdown =
            project(&input(400, 20, &taxes, &classes, &discounts), &PartnerCommissionTable::default())
                .expect("project");
        assert_eq!(breakdown.final_price, Decimal::ZERO);
        assert_eq!(breakdown.net_margin, Decimal::ZERO);
    }

    #[test]
    fn no_profit_tax_on_loss_for_any_tax_configuration() {
        let classes = TaxClasses::services();
        let discounts = DiscountState::default();
        for rate in [0, 10, 35, 100] {
            let taxes = TaxConfig {
                csll: Decimal::new(rate, 0),
                irpj: Decimal::new(rate, 0),
                ..flat_taxes()
            };
            let breakdown =
                project(&input(400, 0, &taxes, &classes, &discounts), &PartnerCommissionTable::default())
                    .expect("project");
            assert!(breakdown.gross_profit <= Decimal::ZERO);
            assert_eq!(breakdown.profit_tax_value, Decimal::ZERO);
        }
    }
}
