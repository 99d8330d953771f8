use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use cotador_core::domain::proposal::{BaseId, ProposalAggregate, ProposalId};
use cotador_core::errors::StoreError;
use cotador_core::proposal::ProposalStore;
use cotador_core::settings::SettingsRepository;

#[derive(Default)]
struct ProposalState {
    proposals: BTreeMap<String, ProposalAggregate>,
    sequences: HashMap<String, u32>,
}

/// Process-local proposal store with the same append-only guarantees as the
/// SQLite one.
#[derive(Default)]
pub struct InMemoryProposalRepository {
    state: RwLock<ProposalState>,
}

#[async_trait]
impl ProposalStore for InMemoryProposalRepository {
    async fn allocate_sequence(&self, prefix: &str) -> Result<u32, StoreError> {
        let mut state = self.state.write().await;
        let next = match state.sequences.get(prefix) {
            Some(last) => last + 1,
            None => {
                let highest = state
                    .proposals
                    .values()
                    .filter_map(|proposal| proposal.base_id.sequence(prefix))
                    .max()
                    .unwrap_or(0);
                highest + 1
            }
        };
        state.sequences.insert(prefix.to_string(), next);
        Ok(next)
    }

    async fn count_versions(&self, base_id: &BaseId) -> Result<u32, StoreError> {
        let state = self.state.read().await;
        let count = state.proposals.values().filter(|p| &p.base_id == base_id).count();
        u32::try_from(count).map_err(|_| StoreError::Decode(format!("version count `{count}`")))
    }

    async fn insert(&self, proposal: &ProposalAggregate) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let clash = state.proposals.contains_key(&proposal.id.0)
            || state
                .proposals
                .values()
                .any(|p| p.base_id == proposal.base_id && p.version == proposal.version);
        if clash {
            return Err(StoreError::Conflict(proposal.id.to_string()));
        }
        state.proposals.insert(proposal.id.0.clone(), proposal.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &ProposalId) -> Result<Option<ProposalAggregate>, StoreError> {
        let state = self.state.read().await;
        Ok(state.proposals.get(&id.0).cloned())
    }

    async fn list_versions(&self, base_id: &BaseId) -> Result<Vec<ProposalAggregate>, StoreError> {
        let state = self.state.read().await;
        let mut versions: Vec<_> =
            state.proposals.values().filter(|p| &p.base_id == base_id).cloned().collect();
        versions.sort_by_key(|p| p.version);
        Ok(versions)
    }

    async fn list_latest(&self) -> Result<Vec<ProposalAggregate>, StoreError> {
        let state = self.state.read().await;
        let mut latest: HashMap<&BaseId, &ProposalAggregate> = HashMap::new();
        for proposal in state.proposals.values() {
            let newer = latest.get(&proposal.base_id).map_or(true, |p| p.version < proposal.version);
            if newer {
                latest.insert(&proposal.base_id, proposal);
            }
        }
        let mut proposals: Vec<_> = latest.into_values().cloned().collect();
        proposals.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(proposals)
    }
}

#[derive(Default)]
pub struct InMemorySettingsRepository {
    values: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.read().await;
        Ok(values.get(key).cloned())
    }

    async fn save(&self, key: &str, value_json: &str) -> Result<(), StoreError> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value_json.to_string());
        Ok(())
    }
}
