pub mod draft;
pub mod store;

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink};
use crate::cpq::commission::PartnerCommissionTable;
use crate::cpq::discount::apply_discounts;
use crate::domain::proposal::{BaseId, ProposalAggregate, ProposalId};
use crate::errors::{ApplicationError, DomainError, ValidationError};
use crate::money::round_money;

pub use draft::ProposalDraft;
pub use store::ProposalStore;

/// Saves drafts as immutable, versioned proposals and keeps a cached listing
/// of the latest version of every lineage.
pub struct ProposalService<S> {
    store: S,
    commission_table: PartnerCommissionTable,
    audit: Arc<dyn AuditSink>,
    proposals: Mutex<Vec<ProposalAggregate>>,
}

impl<S: ProposalStore> ProposalService<S> {
    pub fn new(store: S, commission_table: PartnerCommissionTable) -> Self {
        Self {
            store,
            commission_table,
            audit: Arc::new(TracingAuditSink),
            proposals: Mutex::new(Vec::new()),
        }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Cached listing as of the last successful refresh.
    pub fn proposals(&self) -> Vec<ProposalAggregate> {
        match self.proposals.lock() {
            Ok(cached) => cached.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub async fn refresh(&self) -> Result<Vec<ProposalAggregate>, ApplicationError> {
        let latest = self.store.list_latest().await?;
        match self.proposals.lock() {
            Ok(mut cached) => *cached = latest.clone(),
            Err(poisoned) => *poisoned.into_inner() = latest.clone(),
        }
        Ok(latest)
    }

    /// Persists `draft` as a new immutable version.
    ///
    /// The target lineage is `existing_base_id`, falling back to the lineage a
    /// resumed draft came from. Without either a new lineage is minted as
    /// version 1; otherwise the next version of that lineage is appended. The
    /// draft is only borrowed, so a failed save leaves it intact for a retry.
    pub async fn save(
        &self,
        draft: &ProposalDraft,
        existing_base_id: Option<&BaseId>,
    ) -> Result<ProposalAggregate, ApplicationError> {
        let correlation_id = Uuid::new_v4().to_string();

        let lineage =
            draft.validate_for_save().and_then(|()| target_lineage(draft, existing_base_id));
        let lineage = match lineage {
            Ok(lineage) => lineage,
            Err(error) => {
                self.audit.emit(
                    AuditEvent::new(
                        None,
                        &correlation_id,
                        "proposal.save_rejected",
                        AuditCategory::Persistence,
                        &draft.owner_id,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("reason", error.to_string()),
                );
                return Err(error.into());
            }
        };

        let outcome = apply_discounts(
            draft.raw_total_setup(),
            draft.raw_total_monthly(),
            &draft.discounts,
            &self.commission_table,
            draft.contract_term,
            draft.referral_partner,
        )?;

        let (base_id, version) = match lineage {
            Some(base_id) => {
                let existing = self.store.count_versions(base_id).await?;
                if existing == 0 {
                    return Err(DomainError::ProposalNotFound(base_id.to_string()).into());
                }
                (base_id.clone(), existing + 1)
            }
            None => {
                let prefix = draft.family.id_prefix();
                let sequence = self.store.allocate_sequence(prefix).await?;
                (BaseId::mint(prefix, sequence)?, 1)
            }
        };

        let proposal = ProposalAggregate {
            id: base_id.version_id(version),
            base_id,
            version,
            family: draft.family,
            client: draft.client.clone(),
            account_manager: draft.account_manager.clone(),
            terms: draft.terms(),
            line_items: draft.line_items().to_vec(),
            raw_total_setup: round_money(draft.raw_total_setup()),
            raw_total_monthly: round_money(draft.raw_total_monthly()),
            total_setup: round_money(outcome.final_setup),
            total_monthly: round_money(outcome.final_monthly),
            referral_commission: round_money(outcome.referral_commission),
            created_at: Utc::now(),
            owner_id: draft.owner_id.clone(),
        };

        if let Err(error) = self.store.insert(&proposal).await {
            warn!(
                event_name = "proposal.save_failed",
                correlation_id = %correlation_id,
                proposal_id = %proposal.id,
                error = %error,
                "proposal save failed; draft kept"
            );
            self.audit.emit(
                AuditEvent::new(
                    Some(proposal.id.clone()),
                    &correlation_id,
                    "proposal.save_failed",
                    AuditCategory::Persistence,
                    &draft.owner_id,
                    AuditOutcome::Failed,
                )
                .with_metadata("error", error.to_string()),
            );
            return Err(error.into());
        }

        info!(
            event_name = "proposal.saved",
            correlation_id = %correlation_id,
            proposal_id = %proposal.id,
            version = proposal.version,
            total_monthly = %proposal.total_monthly,
            "proposal saved"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(proposal.id.clone()),
                &correlation_id,
                "proposal.saved",
                AuditCategory::Persistence,
                &draft.owner_id,
                AuditOutcome::Success,
            )
            .with_metadata("version", proposal.version.to_string())
            .with_metadata("total_monthly", proposal.total_monthly.to_string()),
        );

        if let Err(error) = self.refresh().await {
            warn!(
                event_name = "proposal.list_refresh_failed",
                correlation_id = %correlation_id,
                error = %error,
                "saved proposal but could not refresh the proposal list"
            );
        }

        Ok(proposal)
    }

    pub async fn load(&self, id: &ProposalId) -> Result<ProposalAggregate, ApplicationError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::ProposalNotFound(id.to_string()).into())
    }

    pub async fn history(&self, base_id: &BaseId) -> Result<Vec<ProposalAggregate>, ApplicationError> {
        let versions = self.store.list_versions(base_id).await?;
        if versions.is_empty() {
            return Err(DomainError::ProposalNotFound(base_id.to_string()).into());
        }
        Ok(versions)
    }

    /// Loads a saved version back into an editable draft of the same lineage.
    pub async fn resume(&self, id: &ProposalId) -> Result<ProposalDraft, ApplicationError> {
        Ok(ProposalDraft::resume(self.load(id).await?))
    }
}

/// Lineage a save appends to, if any. A lineage only ever holds versions of
/// one product family, identified by its id prefix.
fn target_lineage<'a>(
    draft: &'a ProposalDraft,
    existing_base_id: Option<&'a BaseId>,
) -> Result<Option<&'a BaseId>, ValidationError> {
    let lineage = match (existing_base_id, draft.base_id.as_ref()) {
        (Some(requested), Some(origin)) if requested != origin => {
            return Err(ValidationError::LineageConflict {
                draft: origin.to_string(),
                requested: requested.to_string(),
            });
        }
        (requested, origin) => requested.or(origin),
    };

    if let Some(base_id) = lineage {
        if base_id.sequence(draft.family.id_prefix()).is_none() {
            return Err(ValidationError::LineageFamilyMismatch {
                base_id: base_id.to_string(),
                family: draft.family,
            });
        }
    }
    Ok(lineage)
}
