use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use cotador_core::domain::proposal::{BaseId, ProposalAggregate, ProposalId};
use cotador_core::errors::StoreError;
use cotador_core::proposal::ProposalStore;

use super::RepositoryError;
use crate::DbPool;

/// SQLite-backed, append-only proposal store.
///
/// The full aggregate is kept as JSON in `payload_json`; the other columns are
/// denormalized for listing and for the `UNIQUE(base_id, version)` guard.
pub struct SqlProposalRepository {
    pool: DbPool,
}

impl SqlProposalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn next_sequence(&self, prefix: &str) -> Result<u32, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<i64> =
            sqlx::query("SELECT last_value FROM proposal_sequence WHERE prefix = ?")
                .bind(prefix)
                .fetch_optional(&mut *tx)
                .await?
                .map(|row| row.try_get("last_value"))
                .transpose()?;

        // First allocation for this prefix: continue after any ids already stored.
        let seed = match current {
            Some(_) => 0,
            None => {
                let rows = sqlx::query("SELECT DISTINCT base_id FROM proposal WHERE family_prefix = ?")
                    .bind(prefix)
                    .fetch_all(&mut *tx)
                    .await?;
                let mut highest = 0_u32;
                for row in rows {
                    let base_id: String = row.try_get("base_id")?;
                    if let Some(sequence) = BaseId(base_id).sequence(prefix) {
                        highest = highest.max(sequence);
                    }
                }
                highest
            }
        };

        let next: i64 = sqlx::query(
            "INSERT INTO proposal_sequence (prefix, last_value) VALUES (?, ?)
             ON CONFLICT(prefix) DO UPDATE SET last_value = proposal_sequence.last_value + 1
             RETURNING last_value",
        )
        .bind(prefix)
        .bind(i64::from(seed) + 1)
        .fetch_one(&mut *tx)
        .await?
        .try_get("last_value")?;

        tx.commit().await?;

        let next = u32::try_from(next).map_err(|_| {
            RepositoryError::Decode(format!("sequence `{next}` for `{prefix}` does not fit in u32"))
        })?;
        debug!(event_name = "db.proposal.sequence_allocated", prefix, sequence = next);
        Ok(next)
    }

    async fn insert_version(&self, proposal: &ProposalAggregate) -> Result<(), RepositoryError> {
        let payload = serde_json::to_string(proposal).map_err(RepositoryError::decode)?;

        let result = sqlx::query(
            "INSERT INTO proposal (id, base_id, version, family, family_prefix, client_name,
                                   owner_id, contract_term_months, total_setup, total_monthly,
                                   payload_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&proposal.id.0)
        .bind(&proposal.base_id.0)
        .bind(i64::from(proposal.version))
        .bind(proposal.family.as_str())
        .bind(proposal.family.id_prefix())
        .bind(&proposal.client.name)
        .bind(&proposal.owner_id)
        .bind(i64::from(proposal.terms.contract_term.months()))
        .bind(proposal.total_setup.to_string())
        .bind(proposal.total_monthly.to_string())
        .bind(payload)
        .bind(proposal.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
                Err(RepositoryError::Conflict(proposal.id.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn fetch_payloads(
        &self,
        sql: &str,
        bind: Option<&str>,
    ) -> Result<Vec<ProposalAggregate>, RepositoryError> {
        let mut query = sqlx::query(sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        query.fetch_all(&self.pool).await?.iter().map(row_to_proposal).collect()
    }
}

fn row_to_proposal(row: &SqliteRow) -> Result<ProposalAggregate, RepositoryError> {
    let payload: String = row.try_get("payload_json").map_err(RepositoryError::decode)?;
    serde_json::from_str(&payload).map_err(RepositoryError::decode)
}

#[async_trait]
impl ProposalStore for SqlProposalRepository {
    async fn allocate_sequence(&self, prefix: &str) -> Result<u32, StoreError> {
        Ok(self.next_sequence(prefix).await?)
    }

    async fn count_versions(&self, base_id: &BaseId) -> Result<u32, StoreError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM proposal WHERE base_id = ?")
            .bind(&base_id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?
            .try_get("count")
            .map_err(RepositoryError::from)?;
        u32::try_from(count).map_err(|_| StoreError::Decode(format!("version count `{count}`")))
    }

    async fn insert(&self, proposal: &ProposalAggregate) -> Result<(), StoreError> {
        Ok(self.insert_version(proposal).await?)
    }

    async fn find_by_id(&self, id: &ProposalId) -> Result<Option<ProposalAggregate>, StoreError> {
        let row = sqlx::query("SELECT payload_json FROM proposal WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        match row {
            Some(ref row) => Ok(Some(row_to_proposal(row)?)),
            None => Ok(None),
        }
    }

    async fn list_versions(&self, base_id: &BaseId) -> Result<Vec<ProposalAggregate>, StoreError> {
        Ok(self
            .fetch_payloads(
                "SELECT payload_json FROM proposal WHERE base_id = ? ORDER BY version ASC",
                Some(&base_id.0),
            )
            .await?)
    }

    async fn list_latest(&self) -> Result<Vec<ProposalAggregate>, StoreError> {
        Ok(self
            .fetch_payloads(
                "SELECT p.payload_json
                 FROM proposal p
                 JOIN (SELECT base_id, MAX(version) AS version FROM proposal GROUP BY base_id) latest
                   ON latest.base_id = p.base_id AND latest.version = p.version
                 ORDER BY p.created_at DESC, p.id DESC",
                None,
            )
            .await?)
    }
}
