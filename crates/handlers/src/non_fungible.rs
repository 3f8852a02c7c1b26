//! Handler for non-fungible `Transfer` and `ControlledCollectionCreated`
//! events.
//!
//! Custody is tracked per token, not as a vault-owned list: a hand-off is
//! one delete plus one insert. The `from` side runs strictly before the
//! `to` side so a direct vault-to-vault transfer ends with the new holder
//! and no stale record.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use custodia_core::error::DomainResult;
use custodia_core::metrics::record_anomaly;
use custodia_core::models::{
    CollectionCreated, EventKind, LedgerEvent, NonFungibleCustody, NonFungibleTransfer, u256_hex,
};
use custodia_core::ports::{
    CustodyStore, EntityStore, EventHandler, NonFungibleTokenStore, VaultStore,
};

use crate::provisioning::VaultProvisioner;
use crate::resolver::EntityResolver;

/// Handler for the non-fungible event shapes.
pub struct NonFungibleHandler {
    store: Arc<dyn EntityStore>,
    resolver: Arc<EntityResolver>,
    provisioner: Arc<VaultProvisioner>,
}

impl NonFungibleHandler {
    pub fn new(
        store: Arc<dyn EntityStore>,
        resolver: Arc<EntityResolver>,
        provisioner: Arc<VaultProvisioner>,
    ) -> Self {
        Self {
            store,
            resolver,
            provisioner,
        }
    }

    async fn handle_transfer(&self, transfer: &NonFungibleTransfer) -> DomainResult<()> {
        // Descriptor first: provisioning needs its vault flag. A
        // collection first seen through a plain transfer is not
        // vault-bearing.
        let descriptor = self
            .resolver
            .resolve_non_fungible(&transfer.collection, false)
            .await?;

        self.provisioner.maybe_provision(transfer, &descriptor).await?;

        let key = NonFungibleCustody::key(&transfer.collection, &transfer.token_id);

        // Outflow: the token leaves custody before any attempt to re-add
        // it. The record is recreated below if the destination is also a
        // vault.
        if self.store.vaults().get_vault(&transfer.from).await?.is_some() {
            self.store.custody().delete_custody(&key).await?;
            debug!(
                collection = %transfer.collection,
                token_id = %u256_hex(&transfer.token_id),
                vault = %transfer.from,
                "Token left vault custody"
            );
        }

        // Inflow: load-or-create, then set holder.
        if let Some(vault) = self.store.vaults().get_vault(&transfer.to).await? {
            let custody = match self.store.custody().get_custody(&key).await? {
                Some(mut existing) => {
                    existing.holder = vault.id;
                    existing
                }
                None => NonFungibleCustody::new(transfer.collection, transfer.token_id, vault.id),
            };
            self.store.custody().upsert_custody(&custody).await?;
            debug!(
                collection = %transfer.collection,
                token_id = %u256_hex(&transfer.token_id),
                vault = %vault.id,
                "Token entered vault custody"
            );
        }

        Ok(())
    }

    async fn handle_collection_created(&self, created: &CollectionCreated) -> DomainResult<()> {
        if let Some(existing) = self
            .store
            .non_fungible_tokens()
            .get_non_fungible_token(&created.collection)
            .await?
        {
            // is_vault is fixed at creation and never flips.
            if !existing.is_vault {
                warn!(
                    collection = %created.collection,
                    "⚠️  Collection already resolved without the vault flag, left unchanged"
                );
                record_anomaly("vault_flag_conflict");
            }
            return Ok(());
        }

        self.resolver
            .resolve_non_fungible(&created.collection, true)
            .await?;
        info!(collection = %created.collection, "📦 Controlled collection registered");
        Ok(())
    }
}

#[async_trait]
impl EventHandler for NonFungibleHandler {
    fn kind(&self) -> EventKind {
        EventKind::NonFungible
    }

    async fn handle(&self, event: &LedgerEvent) -> DomainResult<()> {
        match event {
            LedgerEvent::NonFungible(transfer) => self.handle_transfer(transfer).await,
            LedgerEvent::CollectionCreated(created) => {
                self.handle_collection_created(created).await
            }
            _ => Ok(()),
        }
    }
}
