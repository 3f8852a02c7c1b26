//! PostgreSQL storage adapter.
//!
//! This module implements the entity store traits defined in
//! `custodia-core` using PostgreSQL as the backing store.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool and migrations
//! - [`PgEntityStore`] - Composite store implementing `EntityStore`
//! - Individual repos: `PgDescriptorRepository`, `PgVaultRepository`,
//!   `PgBalanceRepository`, `PgCustodyRepository`
//!
//! # Representation
//!
//! Addresses are stored as 20-byte `BYTEA`, amounts and token ids as
//! `NUMERIC(78,0)` (bound as decimal strings, read back as text).
//! Zero-pruning is a hard `DELETE`; a zero-valued balance row is never
//! written.

mod balance_repo;
mod custody_repo;
mod database;
mod descriptor_repo;
mod helpers;
mod vault_repo;

pub use balance_repo::PgBalanceRepository;
pub use custody_repo::PgCustodyRepository;
pub use database::{Database, DatabaseConfig, PurgeStats};
pub use descriptor_repo::PgDescriptorRepository;
pub use vault_repo::PgVaultRepository;

use std::sync::Arc;

use custodia_core::ports::{
    CustodyStore, EntityStore, FungibleBalanceStore, FungibleTokenStore, NonFungibleTokenStore,
    SemiFungibleBalanceStore, SemiFungibleTokenStore, VaultStore,
};

/// Aggregated PostgreSQL repositories implementing the `EntityStore`
/// trait.
pub struct PgEntityStore {
    descriptors: PgDescriptorRepository,
    vaults: PgVaultRepository,
    balances: PgBalanceRepository,
    custody: PgCustodyRepository,
}

impl PgEntityStore {
    /// Create a new store aggregate from a database connection.
    pub fn new(db: Arc<Database>) -> Self {
        let pool = db.pool().clone();
        Self {
            descriptors: PgDescriptorRepository::new(pool.clone()),
            vaults: PgVaultRepository::new(pool.clone()),
            balances: PgBalanceRepository::new(pool.clone()),
            custody: PgCustodyRepository::new(pool),
        }
    }
}

impl EntityStore for PgEntityStore {
    fn fungible_tokens(&self) -> &dyn FungibleTokenStore {
        &self.descriptors
    }
    fn non_fungible_tokens(&self) -> &dyn NonFungibleTokenStore {
        &self.descriptors
    }
    fn semi_fungible_tokens(&self) -> &dyn SemiFungibleTokenStore {
        &self.descriptors
    }
    fn vaults(&self) -> &dyn VaultStore {
        &self.vaults
    }
    fn fungible_balances(&self) -> &dyn FungibleBalanceStore {
        &self.balances
    }
    fn semi_fungible_balances(&self) -> &dyn SemiFungibleBalanceStore {
        &self.balances
    }
    fn custody(&self) -> &dyn CustodyStore {
        &self.custody
    }
}
