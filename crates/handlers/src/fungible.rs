//! Handler for fungible `Transfer` events.
//!
//! Updates per-vault fungible balances: the `from` side (outflow) is
//! evaluated strictly before the `to` side (inflow) so a transfer between
//! two tracked vaults nets out correctly.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use custodia_core::error::DomainResult;
use custodia_core::metrics::record_anomaly;
use custodia_core::models::{EventKind, FungibleBalance, FungibleTransfer, LedgerEvent, Vault};
use custodia_core::ports::{EntityStore, EventHandler, FungibleBalanceStore, VaultStore};

use crate::ledger::{self, OutflowOutcome};
use crate::resolver::EntityResolver;

/// Handler for the fungible transfer shape.
pub struct FungibleHandler {
    store: Arc<dyn EntityStore>,
    resolver: Arc<EntityResolver>,
}

impl FungibleHandler {
    pub fn new(store: Arc<dyn EntityStore>, resolver: Arc<EntityResolver>) -> Self {
        Self { store, resolver }
    }

    /// Inflow: ensure the descriptor exists, then accumulate.
    async fn apply_inflow(&self, vault: &Vault, transfer: &FungibleTransfer) -> DomainResult<()> {
        self.resolver.resolve_fungible(&transfer.token).await?;

        let key = FungibleBalance::key(&vault.id, &transfer.token);
        let current = self
            .store
            .fungible_balances()
            .get_fungible_balance(&key)
            .await?;

        let balance = ledger::accumulate(current.map(|b| b.balance), transfer.value);
        let record = FungibleBalance::new(vault.id, transfer.token, balance);
        self.store
            .fungible_balances()
            .upsert_fungible_balance(&record)
            .await?;

        debug!(vault = %vault.id, token = %transfer.token, "Fungible inflow applied");
        Ok(())
    }

    /// Outflow: decrement, pruning on zero; inconsistent state is logged
    /// and skipped.
    async fn apply_outflow(&self, vault: &Vault, transfer: &FungibleTransfer) -> DomainResult<()> {
        let key = FungibleBalance::key(&vault.id, &transfer.token);
        let current = self
            .store
            .fungible_balances()
            .get_fungible_balance(&key)
            .await?;

        match ledger::apply_outflow(current.map(|b| b.balance), transfer.value) {
            OutflowOutcome::Missing => {
                error!(
                    vault = %vault.id,
                    token = %transfer.token,
                    "❌ Outflow with no recorded balance, decrement skipped"
                );
                record_anomaly("missing_balance");
            }
            OutflowOutcome::Underflow { balance } => {
                error!(
                    vault = %vault.id,
                    token = %transfer.token,
                    recorded = %balance,
                    amount = %transfer.value,
                    "❌ Decrement would go negative, skipped"
                );
                record_anomaly("underflow");
            }
            OutflowOutcome::Pruned => {
                self.store
                    .fungible_balances()
                    .delete_fungible_balance(&key)
                    .await?;
                debug!(vault = %vault.id, token = %transfer.token, "Balance pruned at zero");
            }
            OutflowOutcome::Reduced(rest) => {
                let record = FungibleBalance::new(vault.id, transfer.token, rest);
                self.store
                    .fungible_balances()
                    .upsert_fungible_balance(&record)
                    .await?;
                debug!(vault = %vault.id, token = %transfer.token, "Fungible outflow applied");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for FungibleHandler {
    fn kind(&self) -> EventKind {
        EventKind::Fungible
    }

    async fn handle(&self, event: &LedgerEvent) -> DomainResult<()> {
        let LedgerEvent::Fungible(transfer) = event else {
            return Ok(());
        };

        // Outflow strictly before inflow.
        if let Some(vault) = self.store.vaults().get_vault(&transfer.from).await? {
            self.apply_outflow(&vault, transfer).await?;
        }
        if let Some(vault) = self.store.vaults().get_vault(&transfer.to).await? {
            self.apply_inflow(&vault, transfer).await?;
        }
        Ok(())
    }
}
