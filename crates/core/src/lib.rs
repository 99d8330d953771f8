pub mod audit;
pub mod config;
pub mod cpq;
pub mod domain;
pub mod errors;
pub mod money;
pub mod proposal;
pub mod settings;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use cpq::catalog::PlanCatalog;
pub use cpq::commission::{CommissionTier, PartnerCommissionTable};
pub use cpq::discount::{apply_discounts, DiscountOutcome, DiscountState};
pub use cpq::dre::{project, CostBreakdown, DreInput};
pub use cpq::payback::{PaybackAssessment, PaybackTable, PaybackVariant};
pub use cpq::pricing::{DeterministicPricingEngine, LinePrice, PricingEngine};
pub use cpq::profile::FamilyProfile;
pub use cpq::tax::{TaxClasses, TaxConfig, TaxKind};
pub use cpq::{QuoteEvaluation, QuoteInput, QuoteRuntime};
pub use domain::actor::{Actor, PermissionFlags, Role};
pub use domain::family::ProductFamily;
pub use domain::plan::{OptionFlags, Plan};
pub use domain::proposal::{BaseId, Client, LineItem, LineItemId, ProposalAggregate, ProposalId};
pub use domain::term::ContractTerm;
pub use errors::{ApplicationError, DomainError, InterfaceError, StoreError, ValidationError};
pub use proposal::{ProposalDraft, ProposalService, ProposalStore};
pub use settings::{SettingsRepository, SettingsService};
