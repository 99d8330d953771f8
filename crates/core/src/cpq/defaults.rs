//! Built-in price tables. Persisted overrides are merged on top of these by
//! capacity tier.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::cpq::catalog::PlanCatalog;
use crate::domain::family::ProductFamily;
use crate::domain::plan::Plan;
use crate::domain::term::ContractTerm;

/// Whole-real monthly prices for 12/24/36/48/60 months; 0 marks a term the
/// plan is not sold on.
type TermPrices = [i64; 5];

fn reais(value: i64) -> Decimal {
    Decimal::new(value * 100, 2)
}

fn plan(
    family: ProductFamily,
    capacity_tier: u32,
    prices: TermPrices,
    installation: i64,
    operating: i64,
    auxiliary: Option<i64>,
) -> Plan {
    let monthly_price_by_term: BTreeMap<ContractTerm, Decimal> =
        ContractTerm::ALL.into_iter().zip(prices).map(|(term, price)| (term, reais(price))).collect();

    Plan {
        capacity_tier,
        display_label: format!("{capacity_tier} {}", family.capacity_unit()),
        monthly_price_by_term,
        installation_cost: reais(installation),
        operating_base_cost: reais(operating),
        auxiliary_equipment_cost: auxiliary.map(reais),
    }
}

pub fn default_catalog(family: ProductFamily) -> PlanCatalog {
    use ProductFamily::*;

    let plans = match family {
        Radio => vec![
            plan(Radio, 10, [480, 430, 390, 370, 350], 998, 210, Some(45)),
            plan(Radio, 20, [720, 650, 590, 560, 530], 998, 310, Some(45)),
            plan(Radio, 30, [950, 860, 790, 750, 710], 998, 400, Some(45)),
            plan(Radio, 50, [0, 1290, 1180, 1120, 1060], 1490, 560, Some(80)),
            plan(Radio, 100, [0, 0, 2150, 2040, 1930], 1990, 980, Some(120)),
        ],
        Fiber => vec![
            plan(Fiber, 50, [549, 499, 459, 439, 419], 1200, 190, None),
            plan(Fiber, 100, [799, 729, 679, 649, 619], 1200, 260, None),
            plan(Fiber, 200, [1190, 1090, 999, 959, 919], 1500, 380, None),
            plan(Fiber, 300, [1590, 1450, 1330, 1270, 1210], 1500, 520, None),
            plan(Fiber, 500, [0, 2290, 2090, 1990, 1890], 2500, 830, None),
            plan(Fiber, 1000, [0, 0, 3790, 3590, 3390], 3500, 1450, None),
        ],
        Man => vec![
            plan(Man, 100, [1800, 1650, 1500, 1420, 1350], 4500, 700, Some(350)),
            plan(Man, 500, [3200, 2950, 2700, 2580, 2450], 6000, 1300, Some(600)),
            plan(Man, 1000, [0, 4600, 4200, 4000, 3800], 8000, 2000, Some(900)),
        ],
        Vm => vec![
            plan(Vm, 1, [189, 179, 169, 159, 149], 150, 70, None),
            plan(Vm, 2, [329, 309, 289, 279, 269], 150, 120, None),
            plan(Vm, 4, [599, 569, 539, 519, 499], 250, 220, None),
            plan(Vm, 8, [1099, 1049, 989, 949, 909], 250, 410, None),
        ],
        Pabx => vec![
            plan(Pabx, 10, [390, 360, 330, 310, 290], 600, 140, Some(90)),
            plan(Pabx, 20, [690, 640, 590, 560, 530], 900, 250, Some(160)),
            plan(Pabx, 50, [0, 1490, 1390, 1320, 1250], 1500, 560, Some(350)),
        ],
    };

    PlanCatalog::new(plans)
}
