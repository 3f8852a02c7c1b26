//! Repository for vault records.

use async_trait::async_trait;
use sqlx::PgPool;

use custodia_core::error::{StorageError, StorageResult};
use custodia_core::models::{Address, Vault};
use custodia_core::ports::VaultStore;

use super::helpers::{bytes_to_address, parse_u256};

/// PostgreSQL repository for the vaults table.
pub struct PgVaultRepository {
    pool: PgPool,
}

impl PgVaultRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VaultStore for PgVaultRepository {
    async fn get_vault(&self, address: &Address) -> StorageResult<Option<Vault>> {
        let row = sqlx::query_as::<_, VaultRow>(
            r#"
            SELECT id, owner_token_id::TEXT, originating_collection
            FROM vaults
            WHERE id = $1
            "#,
        )
        .bind(&address.0[..])
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(VaultRow::into_vault).transpose()
    }

    async fn insert_vault(&self, vault: &Vault) -> StorageResult<()> {
        // Creation happens at most once per address; a conflicting insert
        // is a replay and must not overwrite.
        sqlx::query(
            r#"
            INSERT INTO vaults (id, owner_token_id, originating_collection)
            VALUES ($1, $2::NUMERIC, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&vault.id.0[..])
        .bind(vault.owner_token_id.to_string())
        .bind(&vault.originating_collection.0[..])
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(())
    }

    async fn list_vaults(&self, limit: i64) -> StorageResult<Vec<Vault>> {
        let rows = sqlx::query_as::<_, VaultRow>(
            r#"
            SELECT id, owner_token_id::TEXT, originating_collection
            FROM vaults
            ORDER BY id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        rows.into_iter().map(VaultRow::into_vault).collect()
    }
}

// =============================================================================
// Row mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct VaultRow {
    id: Vec<u8>,
    owner_token_id: String,
    originating_collection: Vec<u8>,
}

impl VaultRow {
    fn into_vault(self) -> StorageResult<Vault> {
        Ok(Vault {
            id: bytes_to_address(self.id, "vault.id")?,
            owner_token_id: parse_u256(&self.owner_token_id, "vault.owner_token_id")?,
            originating_collection: bytes_to_address(
                self.originating_collection,
                "vault.originating_collection",
            )?,
        })
    }
}
