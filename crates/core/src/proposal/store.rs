use async_trait::async_trait;

use crate::domain::proposal::{BaseId, ProposalAggregate, ProposalId};
use crate::errors::StoreError;

/// Append-only storage for proposal versions.
///
/// Implementations must never overwrite an existing `{base_id}_v{n}` record and
/// must hand out each `(prefix, sequence)` pair at most once, even under
/// concurrent saves.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Reserves the next lineage sequence number for an id prefix.
    async fn allocate_sequence(&self, prefix: &str) -> Result<u32, StoreError>;

    async fn count_versions(&self, base_id: &BaseId) -> Result<u32, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the id is already taken.
    async fn insert(&self, proposal: &ProposalAggregate) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: &ProposalId) -> Result<Option<ProposalAggregate>, StoreError>;

    /// Every version of one lineage, oldest first.
    async fn list_versions(&self, base_id: &BaseId) -> Result<Vec<ProposalAggregate>, StoreError>;

    /// Latest version of each lineage, newest first.
    async fn list_latest(&self) -> Result<Vec<ProposalAggregate>, StoreError>;
}
