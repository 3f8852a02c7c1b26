//! In-memory entity store.
//!
//! Implements every store trait against plain hash maps behind a mutex.
//! Used by the engine's integration tests and available for local smoke
//! runs without a database. Lock scope is a single synchronous map
//! operation; no lock is held across an await point.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use custodia_core::error::StorageResult;
use custodia_core::models::{
    Address, FungibleBalance, FungibleToken, NonFungibleCustody, NonFungibleToken,
    SemiFungibleBalance, SemiFungibleToken, Vault,
};
use custodia_core::ports::{
    CustodyStore, EntityStore, FungibleBalanceStore, FungibleTokenStore, NonFungibleTokenStore,
    SemiFungibleBalanceStore, SemiFungibleTokenStore, VaultStore,
};

/// In-memory implementation of the full entity store.
#[derive(Default)]
pub struct MemoryStore {
    fungible_tokens: Mutex<HashMap<Address, FungibleToken>>,
    non_fungible_tokens: Mutex<HashMap<Address, NonFungibleToken>>,
    semi_fungible_tokens: Mutex<HashMap<Address, SemiFungibleToken>>,
    vaults: Mutex<HashMap<Address, Vault>>,
    fungible_balances: Mutex<HashMap<String, FungibleBalance>>,
    semi_fungible_balances: Mutex<HashMap<String, SemiFungibleBalance>>,
    custody: Mutex<HashMap<String, NonFungibleCustody>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of fungible balance records (test helper).
    pub fn fungible_balance_count(&self) -> usize {
        self.fungible_balances.lock().expect("poisoned lock").len()
    }

    /// Total number of custody records (test helper).
    pub fn custody_count(&self) -> usize {
        self.custody.lock().expect("poisoned lock").len()
    }

    /// Total number of vault records (test helper).
    pub fn vault_count(&self) -> usize {
        self.vaults.lock().expect("poisoned lock").len()
    }
}

#[async_trait]
impl FungibleTokenStore for MemoryStore {
    async fn get_fungible_token(&self, id: &Address) -> StorageResult<Option<FungibleToken>> {
        Ok(self
            .fungible_tokens
            .lock()
            .expect("poisoned lock")
            .get(id)
            .cloned())
    }

    async fn upsert_fungible_token(&self, token: &FungibleToken) -> StorageResult<()> {
        self.fungible_tokens
            .lock()
            .expect("poisoned lock")
            .insert(token.id, token.clone());
        Ok(())
    }
}

#[async_trait]
impl NonFungibleTokenStore for MemoryStore {
    async fn get_non_fungible_token(
        &self,
        id: &Address,
    ) -> StorageResult<Option<NonFungibleToken>> {
        Ok(self
            .non_fungible_tokens
            .lock()
            .expect("poisoned lock")
            .get(id)
            .cloned())
    }

    async fn upsert_non_fungible_token(&self, token: &NonFungibleToken) -> StorageResult<()> {
        self.non_fungible_tokens
            .lock()
            .expect("poisoned lock")
            .insert(token.id, token.clone());
        Ok(())
    }
}

#[async_trait]
impl SemiFungibleTokenStore for MemoryStore {
    async fn get_semi_fungible_token(
        &self,
        id: &Address,
    ) -> StorageResult<Option<SemiFungibleToken>> {
        Ok(self
            .semi_fungible_tokens
            .lock()
            .expect("poisoned lock")
            .get(id)
            .cloned())
    }

    async fn upsert_semi_fungible_token(&self, token: &SemiFungibleToken) -> StorageResult<()> {
        self.semi_fungible_tokens
            .lock()
            .expect("poisoned lock")
            .insert(token.id, token.clone());
        Ok(())
    }
}

#[async_trait]
impl VaultStore for MemoryStore {
    async fn get_vault(&self, address: &Address) -> StorageResult<Option<Vault>> {
        Ok(self
            .vaults
            .lock()
            .expect("poisoned lock")
            .get(address)
            .cloned())
    }

    async fn insert_vault(&self, vault: &Vault) -> StorageResult<()> {
        self.vaults
            .lock()
            .expect("poisoned lock")
            .insert(vault.id, vault.clone());
        Ok(())
    }

    async fn list_vaults(&self, limit: i64) -> StorageResult<Vec<Vault>> {
        let mut vaults: Vec<Vault> = self
            .vaults
            .lock()
            .expect("poisoned lock")
            .values()
            .cloned()
            .collect();
        vaults.sort_by_key(|v| v.id.0);
        vaults.truncate(limit.max(0) as usize);
        Ok(vaults)
    }
}

#[async_trait]
impl FungibleBalanceStore for MemoryStore {
    async fn get_fungible_balance(&self, key: &str) -> StorageResult<Option<FungibleBalance>> {
        Ok(self
            .fungible_balances
            .lock()
            .expect("poisoned lock")
            .get(key)
            .cloned())
    }

    async fn upsert_fungible_balance(&self, balance: &FungibleBalance) -> StorageResult<()> {
        self.fungible_balances
            .lock()
            .expect("poisoned lock")
            .insert(balance.id.clone(), balance.clone());
        Ok(())
    }

    async fn delete_fungible_balance(&self, key: &str) -> StorageResult<()> {
        self.fungible_balances
            .lock()
            .expect("poisoned lock")
            .remove(key);
        Ok(())
    }

    async fn list_fungible_balances_for_vault(
        &self,
        vault: &Address,
    ) -> StorageResult<Vec<FungibleBalance>> {
        let mut balances: Vec<FungibleBalance> = self
            .fungible_balances
            .lock()
            .expect("poisoned lock")
            .values()
            .filter(|b| b.vault == *vault)
            .cloned()
            .collect();
        balances.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(balances)
    }
}

#[async_trait]
impl SemiFungibleBalanceStore for MemoryStore {
    async fn get_semi_fungible_balance(
        &self,
        key: &str,
    ) -> StorageResult<Option<SemiFungibleBalance>> {
        Ok(self
            .semi_fungible_balances
            .lock()
            .expect("poisoned lock")
            .get(key)
            .cloned())
    }

    async fn upsert_semi_fungible_balance(
        &self,
        balance: &SemiFungibleBalance,
    ) -> StorageResult<()> {
        self.semi_fungible_balances
            .lock()
            .expect("poisoned lock")
            .insert(balance.id.clone(), balance.clone());
        Ok(())
    }

    async fn delete_semi_fungible_balance(&self, key: &str) -> StorageResult<()> {
        self.semi_fungible_balances
            .lock()
            .expect("poisoned lock")
            .remove(key);
        Ok(())
    }

    async fn list_semi_fungible_balances_for_vault(
        &self,
        vault: &Address,
    ) -> StorageResult<Vec<SemiFungibleBalance>> {
        let mut balances: Vec<SemiFungibleBalance> = self
            .semi_fungible_balances
            .lock()
            .expect("poisoned lock")
            .values()
            .filter(|b| b.vault == *vault)
            .cloned()
            .collect();
        balances.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(balances)
    }
}

#[async_trait]
impl CustodyStore for MemoryStore {
    async fn get_custody(&self, key: &str) -> StorageResult<Option<NonFungibleCustody>> {
        Ok(self
            .custody
            .lock()
            .expect("poisoned lock")
            .get(key)
            .cloned())
    }

    async fn upsert_custody(&self, custody: &NonFungibleCustody) -> StorageResult<()> {
        self.custody
            .lock()
            .expect("poisoned lock")
            .insert(custody.id.clone(), custody.clone());
        Ok(())
    }

    async fn delete_custody(&self, key: &str) -> StorageResult<()> {
        self.custody.lock().expect("poisoned lock").remove(key);
        Ok(())
    }

    async fn list_custody_for_vault(
        &self,
        vault: &Address,
    ) -> StorageResult<Vec<NonFungibleCustody>> {
        let mut records: Vec<NonFungibleCustody> = self
            .custody
            .lock()
            .expect("poisoned lock")
            .values()
            .filter(|c| c.holder == *vault)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }
}

impl EntityStore for MemoryStore {
    fn fungible_tokens(&self) -> &dyn FungibleTokenStore {
        self
    }
    fn non_fungible_tokens(&self) -> &dyn NonFungibleTokenStore {
        self
    }
    fn semi_fungible_tokens(&self) -> &dyn SemiFungibleTokenStore {
        self
    }
    fn vaults(&self) -> &dyn VaultStore {
        self
    }
    fn fungible_balances(&self) -> &dyn FungibleBalanceStore {
        self
    }
    fn semi_fungible_balances(&self) -> &dyn SemiFungibleBalanceStore {
        self
    }
    fn custody(&self) -> &dyn CustodyStore {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodia_core::models::U256;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[tokio::test]
    async fn absent_lookup_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get_vault(&addr(1)).await.unwrap().is_none());
        assert!(store.get_fungible_balance("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        let balance = FungibleBalance::new(addr(1), addr(2), U256::from(5u64));
        store.upsert_fungible_balance(&balance).await.unwrap();
        store.delete_fungible_balance(&balance.id).await.unwrap();
        store.delete_fungible_balance(&balance.id).await.unwrap();
        assert_eq!(store.fungible_balance_count(), 0);
    }

    #[tokio::test]
    async fn list_for_vault_filters_by_holder() {
        let store = MemoryStore::new();
        store
            .upsert_fungible_balance(&FungibleBalance::new(addr(1), addr(9), U256::from(5u64)))
            .await
            .unwrap();
        store
            .upsert_fungible_balance(&FungibleBalance::new(addr(2), addr(9), U256::from(7u64)))
            .await
            .unwrap();

        let balances = store.list_fungible_balances_for_vault(&addr(1)).await.unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].balance, U256::from(5u64));
    }
}
