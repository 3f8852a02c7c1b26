//! Repository for non-fungible custody records.

use async_trait::async_trait;
use sqlx::PgPool;

use custodia_core::error::{StorageError, StorageResult};
use custodia_core::models::{Address, NonFungibleCustody};
use custodia_core::ports::CustodyStore;

use super::helpers::{bytes_to_address, parse_u256};

/// PostgreSQL repository for the non_fungible_custody table.
pub struct PgCustodyRepository {
    pool: PgPool,
}

impl PgCustodyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustodyStore for PgCustodyRepository {
    async fn get_custody(&self, key: &str) -> StorageResult<Option<NonFungibleCustody>> {
        let row = sqlx::query_as::<_, CustodyRow>(
            r#"
            SELECT id, collection, token_id::TEXT, holder
            FROM non_fungible_custody
            WHERE id = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(CustodyRow::into_custody).transpose()
    }

    async fn upsert_custody(&self, custody: &NonFungibleCustody) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO non_fungible_custody (id, collection, token_id, holder)
            VALUES ($1, $2, $3::NUMERIC, $4)
            ON CONFLICT (id) DO UPDATE SET holder = EXCLUDED.holder
            "#,
        )
        .bind(&custody.id)
        .bind(&custody.collection.0[..])
        .bind(custody.token_id.to_string())
        .bind(&custody.holder.0[..])
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(())
    }

    async fn delete_custody(&self, key: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM non_fungible_custody WHERE id = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(())
    }

    async fn list_custody_for_vault(
        &self,
        vault: &Address,
    ) -> StorageResult<Vec<NonFungibleCustody>> {
        let rows = sqlx::query_as::<_, CustodyRow>(
            r#"
            SELECT id, collection, token_id::TEXT, holder
            FROM non_fungible_custody
            WHERE holder = $1
            ORDER BY id ASC
            "#,
        )
        .bind(&vault.0[..])
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        rows.into_iter().map(CustodyRow::into_custody).collect()
    }
}

// =============================================================================
// Row mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct CustodyRow {
    id: String,
    collection: Vec<u8>,
    token_id: String,
    holder: Vec<u8>,
}

impl CustodyRow {
    fn into_custody(self) -> StorageResult<NonFungibleCustody> {
        Ok(NonFungibleCustody {
            id: self.id,
            collection: bytes_to_address(self.collection, "custody.collection")?,
            token_id: parse_u256(&self.token_id, "custody.token_id")?,
            holder: bytes_to_address(self.holder, "custody.holder")?,
        })
    }
}
