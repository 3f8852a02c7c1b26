//! Handler for semi-fungible `TransferSingle` and `TransferBatch` events.
//!
//! Both shapes reuse the balance ledger once per (id, value) pair, in
//! array order for batches. Pair order only affects log ordering - the
//! per-pair operations commute, so final balances are order-independent.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use custodia_core::error::DomainResult;
use custodia_core::metrics::record_anomaly;
use custodia_core::models::{
    Address, EventKind, LedgerEvent, SemiFungibleBalance, U256, Vault, u256_hex,
};
use custodia_core::ports::{EntityStore, EventHandler, SemiFungibleBalanceStore, VaultStore};

use crate::ledger::{self, OutflowOutcome};
use crate::resolver::EntityResolver;

/// Handler for the semi-fungible event shapes.
pub struct SemiFungibleHandler {
    store: Arc<dyn EntityStore>,
    resolver: Arc<EntityResolver>,
}

impl SemiFungibleHandler {
    pub fn new(store: Arc<dyn EntityStore>, resolver: Arc<EntityResolver>) -> Self {
        Self { store, resolver }
    }

    /// Reconcile one (id, value) pair: outflow strictly before inflow.
    async fn apply_pair(
        &self,
        token: &Address,
        from: &Address,
        to: &Address,
        id: &U256,
        value: &U256,
    ) -> DomainResult<()> {
        if let Some(vault) = self.store.vaults().get_vault(from).await? {
            self.apply_outflow(&vault, token, id, value).await?;
        }
        if let Some(vault) = self.store.vaults().get_vault(to).await? {
            self.apply_inflow(&vault, token, id, value).await?;
        }
        Ok(())
    }

    async fn apply_inflow(
        &self,
        vault: &Vault,
        token: &Address,
        id: &U256,
        value: &U256,
    ) -> DomainResult<()> {
        self.resolver.resolve_semi_fungible(token).await?;

        let key = SemiFungibleBalance::key(token, id, &vault.id);
        let current = self
            .store
            .semi_fungible_balances()
            .get_semi_fungible_balance(&key)
            .await?;

        let balance = ledger::accumulate(current.map(|b| b.balance), *value);
        let record = SemiFungibleBalance::new(*token, *id, vault.id, balance);
        self.store
            .semi_fungible_balances()
            .upsert_semi_fungible_balance(&record)
            .await?;

        debug!(
            vault = %vault.id,
            token = %token,
            token_id = %u256_hex(id),
            "Semi-fungible inflow applied"
        );
        Ok(())
    }

    async fn apply_outflow(
        &self,
        vault: &Vault,
        token: &Address,
        id: &U256,
        value: &U256,
    ) -> DomainResult<()> {
        let key = SemiFungibleBalance::key(token, id, &vault.id);
        let current = self
            .store
            .semi_fungible_balances()
            .get_semi_fungible_balance(&key)
            .await?;

        match ledger::apply_outflow(current.map(|b| b.balance), *value) {
            OutflowOutcome::Missing => {
                error!(
                    vault = %vault.id,
                    token = %token,
                    token_id = %u256_hex(id),
                    "❌ Outflow with no recorded balance, decrement skipped"
                );
                record_anomaly("missing_balance");
            }
            OutflowOutcome::Underflow { balance } => {
                error!(
                    vault = %vault.id,
                    token = %token,
                    token_id = %u256_hex(id),
                    recorded = %balance,
                    amount = %value,
                    "❌ Decrement would go negative, skipped"
                );
                record_anomaly("underflow");
            }
            OutflowOutcome::Pruned => {
                self.store
                    .semi_fungible_balances()
                    .delete_semi_fungible_balance(&key)
                    .await?;
                debug!(
                    vault = %vault.id,
                    token = %token,
                    token_id = %u256_hex(id),
                    "Balance pruned at zero"
                );
            }
            OutflowOutcome::Reduced(rest) => {
                let record = SemiFungibleBalance::new(*token, *id, vault.id, rest);
                self.store
                    .semi_fungible_balances()
                    .upsert_semi_fungible_balance(&record)
                    .await?;
                debug!(
                    vault = %vault.id,
                    token = %token,
                    token_id = %u256_hex(id),
                    "Semi-fungible outflow applied"
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for SemiFungibleHandler {
    fn kind(&self) -> EventKind {
        EventKind::SemiFungible
    }

    async fn handle(&self, event: &LedgerEvent) -> DomainResult<()> {
        match event {
            LedgerEvent::SemiFungibleSingle(t) => {
                self.apply_pair(&t.token, &t.from, &t.to, &t.id, &t.value)
                    .await
            }
            LedgerEvent::SemiFungibleBatch(t) => {
                if t.ids.len() != t.values.len() {
                    error!(
                        token = %t.token,
                        ids = t.ids.len(),
                        values = t.values.len(),
                        "❌ Batch arity mismatch, event skipped"
                    );
                    record_anomaly("batch_arity_mismatch");
                    return Ok(());
                }

                for (id, value) in t.ids.iter().zip(t.values.iter()) {
                    // Zero-value pairs are no-ops, same as a zero-value
                    // single transfer.
                    if value.is_zero() {
                        continue;
                    }
                    self.apply_pair(&t.token, &t.from, &t.to, id, value).await?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
