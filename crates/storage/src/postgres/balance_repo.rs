//! Repository for balance records, both families.
//!
//! Zero-pruning is enforced here as a hard `DELETE`: the engine never
//! asks to store a zero balance, and a `CHECK (balance > 0)` constraint
//! backs that invariant at the schema level.

use async_trait::async_trait;
use sqlx::PgPool;

use custodia_core::error::{StorageError, StorageResult};
use custodia_core::models::{Address, FungibleBalance, SemiFungibleBalance};
use custodia_core::ports::{FungibleBalanceStore, SemiFungibleBalanceStore};

use super::helpers::{bytes_to_address, parse_u256};

/// PostgreSQL repository for the balance tables.
pub struct PgBalanceRepository {
    pool: PgPool,
}

impl PgBalanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FungibleBalanceStore for PgBalanceRepository {
    async fn get_fungible_balance(&self, key: &str) -> StorageResult<Option<FungibleBalance>> {
        let row = sqlx::query_as::<_, FungibleBalanceRow>(
            r#"
            SELECT id, vault, token, balance::TEXT
            FROM fungible_balances
            WHERE id = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(FungibleBalanceRow::into_balance).transpose()
    }

    async fn upsert_fungible_balance(&self, balance: &FungibleBalance) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO fungible_balances (id, vault, token, balance)
            VALUES ($1, $2, $3, $4::NUMERIC)
            ON CONFLICT (id) DO UPDATE SET balance = EXCLUDED.balance
            "#,
        )
        .bind(&balance.id)
        .bind(&balance.vault.0[..])
        .bind(&balance.token.0[..])
        .bind(balance.balance.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(())
    }

    async fn delete_fungible_balance(&self, key: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM fungible_balances WHERE id = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(())
    }

    async fn list_fungible_balances_for_vault(
        &self,
        vault: &Address,
    ) -> StorageResult<Vec<FungibleBalance>> {
        let rows = sqlx::query_as::<_, FungibleBalanceRow>(
            r#"
            SELECT id, vault, token, balance::TEXT
            FROM fungible_balances
            WHERE vault = $1
            ORDER BY id ASC
            "#,
        )
        .bind(&vault.0[..])
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        rows.into_iter()
            .map(FungibleBalanceRow::into_balance)
            .collect()
    }
}

#[async_trait]
impl SemiFungibleBalanceStore for PgBalanceRepository {
    async fn get_semi_fungible_balance(
        &self,
        key: &str,
    ) -> StorageResult<Option<SemiFungibleBalance>> {
        let row = sqlx::query_as::<_, SemiFungibleBalanceRow>(
            r#"
            SELECT id, token, token_id::TEXT, vault, balance::TEXT
            FROM semi_fungible_balances
            WHERE id = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(SemiFungibleBalanceRow::into_balance).transpose()
    }

    async fn upsert_semi_fungible_balance(
        &self,
        balance: &SemiFungibleBalance,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO semi_fungible_balances (id, token, token_id, vault, balance)
            VALUES ($1, $2, $3::NUMERIC, $4, $5::NUMERIC)
            ON CONFLICT (id) DO UPDATE SET balance = EXCLUDED.balance
            "#,
        )
        .bind(&balance.id)
        .bind(&balance.token.0[..])
        .bind(balance.token_id.to_string())
        .bind(&balance.vault.0[..])
        .bind(balance.balance.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(())
    }

    async fn delete_semi_fungible_balance(&self, key: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM semi_fungible_balances WHERE id = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(())
    }

    async fn list_semi_fungible_balances_for_vault(
        &self,
        vault: &Address,
    ) -> StorageResult<Vec<SemiFungibleBalance>> {
        let rows = sqlx::query_as::<_, SemiFungibleBalanceRow>(
            r#"
            SELECT id, token, token_id::TEXT, vault, balance::TEXT
            FROM semi_fungible_balances
            WHERE vault = $1
            ORDER BY id ASC
            "#,
        )
        .bind(&vault.0[..])
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        rows.into_iter()
            .map(SemiFungibleBalanceRow::into_balance)
            .collect()
    }
}

// =============================================================================
// Row mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct FungibleBalanceRow {
    id: String,
    vault: Vec<u8>,
    token: Vec<u8>,
    balance: String,
}

impl FungibleBalanceRow {
    fn into_balance(self) -> StorageResult<FungibleBalance> {
        Ok(FungibleBalance {
            id: self.id,
            vault: bytes_to_address(self.vault, "fungible_balance.vault")?,
            token: bytes_to_address(self.token, "fungible_balance.token")?,
            balance: parse_u256(&self.balance, "fungible_balance.balance")?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SemiFungibleBalanceRow {
    id: String,
    token: Vec<u8>,
    token_id: String,
    vault: Vec<u8>,
    balance: String,
}

impl SemiFungibleBalanceRow {
    fn into_balance(self) -> StorageResult<SemiFungibleBalance> {
        Ok(SemiFungibleBalance {
            id: self.id,
            token: bytes_to_address(self.token, "semi_fungible_balance.token")?,
            token_id: parse_u256(&self.token_id, "semi_fungible_balance.token_id")?,
            vault: bytes_to_address(self.vault, "semi_fungible_balance.vault")?,
            balance: parse_u256(&self.balance, "semi_fungible_balance.balance")?,
        })
    }
}
