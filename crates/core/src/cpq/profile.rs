use serde::{Deserialize, Serialize};

use crate::cpq::catalog::PlanCatalog;
use crate::cpq::defaults::default_catalog;
use crate::cpq::payback::{PaybackTable, PaybackVariant};
use crate::cpq::tax::TaxClasses;
use crate::domain::family::ProductFamily;

/// Everything that differs between product families: the plan catalog, the
/// payback thresholds and which taxes apply to revenue vs profit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyProfile {
    pub family: ProductFamily,
    pub catalog: PlanCatalog,
    pub payback: PaybackTable,
    pub tax_classes: TaxClasses,
}

impl FamilyProfile {
    pub fn default_for(family: ProductFamily) -> Self {
        let (payback, tax_classes) = match family {
            ProductFamily::Radio | ProductFamily::Fiber => {
                (PaybackVariant::Standard, TaxClasses::telecom())
            }
            ProductFamily::Man => (PaybackVariant::Extended, TaxClasses::telecom()),
            ProductFamily::Vm | ProductFamily::Pabx => {
                (PaybackVariant::Standard, TaxClasses::services())
            }
        };

        Self { family, catalog: default_catalog(family), payback: payback.table(), tax_classes }
    }

    pub fn with_catalog(mut self, catalog: PlanCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_payback(mut self, payback: PaybackTable) -> Self {
        self.payback = payback;
        self
    }

    pub fn id_prefix(&self) -> &'static str {
        self.family.id_prefix()
    }
}
