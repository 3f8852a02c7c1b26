//! Port traits for the persistent entity store.
//!
//! These traits define the storage interface used by the domain layer.
//! Implementations live in the infrastructure layer (`custodia-storage`):
//! PostgreSQL in production, in-memory for tests.
//!
//! All entities are addressed by string keys (hex addresses or composite
//! keys, see [`crate::models`]). "Absent" is normal control flow - it
//! triggers the create path - so lookups return `Option`, never
//! `NotFound` errors.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::{
    Address, FungibleBalance, FungibleToken, NonFungibleCustody, NonFungibleToken,
    SemiFungibleBalance, SemiFungibleToken, Vault,
};

// =============================================================================
// Descriptor Stores
// =============================================================================

/// Store for fungible token descriptors.
#[async_trait]
pub trait FungibleTokenStore: Send + Sync {
    /// Get a descriptor by contract address.
    async fn get_fungible_token(&self, id: &Address) -> StorageResult<Option<FungibleToken>>;

    /// Insert or replace a descriptor.
    async fn upsert_fungible_token(&self, token: &FungibleToken) -> StorageResult<()>;
}

/// Store for non-fungible collection descriptors.
#[async_trait]
pub trait NonFungibleTokenStore: Send + Sync {
    /// Get a descriptor by contract address.
    async fn get_non_fungible_token(
        &self,
        id: &Address,
    ) -> StorageResult<Option<NonFungibleToken>>;

    /// Insert or replace a descriptor.
    async fn upsert_non_fungible_token(&self, token: &NonFungibleToken) -> StorageResult<()>;
}

/// Store for semi-fungible (multi-token) descriptors.
#[async_trait]
pub trait SemiFungibleTokenStore: Send + Sync {
    /// Get a descriptor by contract address.
    async fn get_semi_fungible_token(
        &self,
        id: &Address,
    ) -> StorageResult<Option<SemiFungibleToken>>;

    /// Insert or replace a descriptor.
    async fn upsert_semi_fungible_token(&self, token: &SemiFungibleToken) -> StorageResult<()>;
}

// =============================================================================
// Vault Registry
// =============================================================================

/// Store for vault records.
///
/// Lookup is a pure read: creation is performed only by the provisioning
/// rule, never materialized on lookup, so an address that merely
/// coincides with a vault address can never become a vault by accident.
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// Get a vault by its computed address.
    async fn get_vault(&self, address: &Address) -> StorageResult<Option<Vault>>;

    /// Insert a vault record. Called only by the provisioning rule.
    async fn insert_vault(&self, vault: &Vault) -> StorageResult<()>;

    /// List vaults, ordered by address for deterministic pagination.
    async fn list_vaults(&self, limit: i64) -> StorageResult<Vec<Vault>>;
}

// =============================================================================
// Balance Stores
// =============================================================================

/// Store for fungible balance records.
#[async_trait]
pub trait FungibleBalanceStore: Send + Sync {
    /// Get a balance by composite key.
    async fn get_fungible_balance(&self, key: &str) -> StorageResult<Option<FungibleBalance>>;

    /// Insert or replace a balance record.
    async fn upsert_fungible_balance(&self, balance: &FungibleBalance) -> StorageResult<()>;

    /// Delete a balance record (zero-pruning).
    async fn delete_fungible_balance(&self, key: &str) -> StorageResult<()>;

    /// List all fungible balances held by a vault.
    async fn list_fungible_balances_for_vault(
        &self,
        vault: &Address,
    ) -> StorageResult<Vec<FungibleBalance>>;
}

/// Store for semi-fungible balance records.
#[async_trait]
pub trait SemiFungibleBalanceStore: Send + Sync {
    /// Get a balance by composite key.
    async fn get_semi_fungible_balance(
        &self,
        key: &str,
    ) -> StorageResult<Option<SemiFungibleBalance>>;

    /// Insert or replace a balance record.
    async fn upsert_semi_fungible_balance(
        &self,
        balance: &SemiFungibleBalance,
    ) -> StorageResult<()>;

    /// Delete a balance record (zero-pruning).
    async fn delete_semi_fungible_balance(&self, key: &str) -> StorageResult<()>;

    /// List all semi-fungible balances held by a vault.
    async fn list_semi_fungible_balances_for_vault(
        &self,
        vault: &Address,
    ) -> StorageResult<Vec<SemiFungibleBalance>>;
}

// =============================================================================
// Custody Store
// =============================================================================

/// Store for non-fungible custody records.
#[async_trait]
pub trait CustodyStore: Send + Sync {
    /// Get a custody record by composite key.
    async fn get_custody(&self, key: &str) -> StorageResult<Option<NonFungibleCustody>>;

    /// Insert or replace a custody record.
    async fn upsert_custody(&self, custody: &NonFungibleCustody) -> StorageResult<()>;

    /// Delete a custody record (the token left vault custody).
    async fn delete_custody(&self, key: &str) -> StorageResult<()>;

    /// List all non-fungible tokens currently held by a vault.
    async fn list_custody_for_vault(
        &self,
        vault: &Address,
    ) -> StorageResult<Vec<NonFungibleCustody>>;
}

// =============================================================================
// Composite Store
// =============================================================================

/// Combined entity store access for the engine.
///
/// The store exclusively owns persisted state; the engine holds no
/// durable state itself and can always start from an empty in-memory
/// context relying solely on store reads.
pub trait EntityStore: Send + Sync {
    /// Access the fungible token descriptor store.
    fn fungible_tokens(&self) -> &dyn FungibleTokenStore;

    /// Access the non-fungible collection descriptor store.
    fn non_fungible_tokens(&self) -> &dyn NonFungibleTokenStore;

    /// Access the semi-fungible descriptor store.
    fn semi_fungible_tokens(&self) -> &dyn SemiFungibleTokenStore;

    /// Access the vault registry.
    fn vaults(&self) -> &dyn VaultStore;

    /// Access the fungible balance store.
    fn fungible_balances(&self) -> &dyn FungibleBalanceStore;

    /// Access the semi-fungible balance store.
    fn semi_fungible_balances(&self) -> &dyn SemiFungibleBalanceStore;

    /// Access the non-fungible custody store.
    fn custody(&self) -> &dyn CustodyStore;
}
