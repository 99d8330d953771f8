//! Currency helpers. The quoting tool works in a single currency (BRL) with a
//! fixed presentation: `R$ ` prefix, two decimals, comma as decimal separator.

use rust_decimal::{Decimal, RoundingStrategy};

pub const CURRENCY_PREFIX: &str = "R$ ";

pub fn round_money(amount: Decimal) -> Decimal {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}

pub fn format_brl(amount: Decimal) -> String {
    let rounded = round_money(amount);
    format!("{CURRENCY_PREFIX}{}", format!("{rounded:.2}").replace('.', ","))
}

pub fn format_percent(value: Decimal) -> String {
    let rounded = round_money(value);
    format!("{}%", format!("{rounded:.2}").replace('.', ","))
}

/// `value * pct / 100`.
pub fn percent_of(value: Decimal, pct: Decimal) -> Decimal {
    value * pct / Decimal::ONE_HUNDRED
}

/// Multiplicative factor for a percentage-off discount (`20` -> `0.80`).
pub fn discount_factor(pct: Decimal) -> Decimal {
    Decimal::ONE - pct / Decimal::ONE_HUNDRED
}
