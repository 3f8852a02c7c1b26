//! Repository for token descriptor entities.
//!
//! One repository covers all three descriptor families; they share the
//! create-once, never-mutate lifecycle.

use async_trait::async_trait;
use sqlx::PgPool;

use custodia_core::error::{StorageError, StorageResult};
use custodia_core::models::{Address, FungibleToken, NonFungibleToken, SemiFungibleToken};
use custodia_core::ports::{FungibleTokenStore, NonFungibleTokenStore, SemiFungibleTokenStore};

use super::helpers::bytes_to_address;

/// PostgreSQL repository for the descriptor tables.
pub struct PgDescriptorRepository {
    pool: PgPool,
}

impl PgDescriptorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FungibleTokenStore for PgDescriptorRepository {
    async fn get_fungible_token(&self, id: &Address) -> StorageResult<Option<FungibleToken>> {
        let row = sqlx::query_as::<_, FungibleTokenRow>(
            "SELECT id, name, symbol, decimals FROM fungible_tokens WHERE id = $1",
        )
        .bind(&id.0[..])
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(FungibleTokenRow::into_token).transpose()
    }

    async fn upsert_fungible_token(&self, token: &FungibleToken) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO fungible_tokens (id, name, symbol, decimals)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                symbol = EXCLUDED.symbol,
                decimals = EXCLUDED.decimals
            "#,
        )
        .bind(&token.id.0[..])
        .bind(&token.name)
        .bind(&token.symbol)
        .bind(token.decimals.map(|d| d as i32))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl NonFungibleTokenStore for PgDescriptorRepository {
    async fn get_non_fungible_token(
        &self,
        id: &Address,
    ) -> StorageResult<Option<NonFungibleToken>> {
        let row = sqlx::query_as::<_, NonFungibleTokenRow>(
            "SELECT id, name, base_uri, is_vault FROM non_fungible_tokens WHERE id = $1",
        )
        .bind(&id.0[..])
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(NonFungibleTokenRow::into_token).transpose()
    }

    async fn upsert_non_fungible_token(&self, token: &NonFungibleToken) -> StorageResult<()> {
        // is_vault never flips after creation; the conflict arm keeps
        // the stored flag.
        sqlx::query(
            r#"
            INSERT INTO non_fungible_tokens (id, name, base_uri, is_vault)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                base_uri = EXCLUDED.base_uri
            "#,
        )
        .bind(&token.id.0[..])
        .bind(&token.name)
        .bind(&token.base_uri)
        .bind(token.is_vault)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SemiFungibleTokenStore for PgDescriptorRepository {
    async fn get_semi_fungible_token(
        &self,
        id: &Address,
    ) -> StorageResult<Option<SemiFungibleToken>> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT id FROM semi_fungible_tokens WHERE id = $1")
                .bind(&id.0[..])
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(|(id,)| {
            Ok(SemiFungibleToken {
                id: bytes_to_address(id, "semi_fungible_token.id")?,
            })
        })
        .transpose()
    }

    async fn upsert_semi_fungible_token(&self, token: &SemiFungibleToken) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO semi_fungible_tokens (id) VALUES ($1) ON CONFLICT (id) DO NOTHING",
        )
        .bind(&token.id.0[..])
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// Row mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct FungibleTokenRow {
    id: Vec<u8>,
    name: Option<String>,
    symbol: Option<String>,
    decimals: Option<i32>,
}

impl FungibleTokenRow {
    fn into_token(self) -> StorageResult<FungibleToken> {
        Ok(FungibleToken {
            id: bytes_to_address(self.id, "fungible_token.id")?,
            name: self.name,
            symbol: self.symbol,
            decimals: self.decimals.map(|d| d as u32),
        })
    }
}

#[derive(sqlx::FromRow)]
struct NonFungibleTokenRow {
    id: Vec<u8>,
    name: Option<String>,
    base_uri: Option<String>,
    is_vault: bool,
}

impl NonFungibleTokenRow {
    fn into_token(self) -> StorageResult<NonFungibleToken> {
        Ok(NonFungibleToken {
            id: bytes_to_address(self.id, "non_fungible_token.id")?,
            name: self.name,
            base_uri: self.base_uri,
            is_vault: self.is_vault,
        })
    }
}
