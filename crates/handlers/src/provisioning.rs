//! Vault provisioning rule.
//!
//! A vault is provisioned when a vault-bearing collection mints a fresh
//! token: the sending address is the configured null address ("minted"
//! sentinel) rather than an existing holder. The vault address is
//! computed counterfactually by the collection's controller, so custody
//! can be tracked before any contract is deployed there.

use std::sync::Arc;

use tracing::{debug, info, warn};

use custodia_core::error::DomainResult;
use custodia_core::metrics::{record_provisioning_revert, record_vault_provisioned};
use custodia_core::models::{Address, NonFungibleToken, NonFungibleTransfer, Vault, u256_hex};
use custodia_core::ports::{EntityStore, Reverted, TokenReader, VaultStore};

/// Creates vault records for qualifying mints.
pub struct VaultProvisioner {
    store: Arc<dyn EntityStore>,
    reader: Arc<dyn TokenReader>,
    /// The ledger's "minted" sentinel. Injected configuration, never an
    /// embedded literal.
    null_address: Address,
}

impl VaultProvisioner {
    pub fn new(
        store: Arc<dyn EntityStore>,
        reader: Arc<dyn TokenReader>,
        null_address: Address,
    ) -> Self {
        Self {
            store,
            reader,
            null_address,
        }
    }

    /// Provision a vault if this transfer is a qualifying mint.
    ///
    /// Fires only when the collection descriptor carries `is_vault` and
    /// the sender is the null address. A reverted address computation
    /// abandons the step - no vault is created, and the enclosing event
    /// is still otherwise processed. Replay-safe: an existing vault at
    /// the computed address is left untouched.
    pub async fn maybe_provision(
        &self,
        transfer: &NonFungibleTransfer,
        descriptor: &NonFungibleToken,
    ) -> DomainResult<()> {
        if !descriptor.is_vault || transfer.from != self.null_address {
            return Ok(());
        }

        let address = match self
            .reader
            .try_compute_vault_address(&transfer.collection, &transfer.token_id)
            .await
        {
            Ok(address) => address,
            Err(Reverted) => {
                warn!(
                    collection = %transfer.collection,
                    token_id = %u256_hex(&transfer.token_id),
                    "⚠️  Vault address computation reverted, mint left unaccounted"
                );
                record_provisioning_revert();
                return Ok(());
            }
        };

        if self.store.vaults().get_vault(&address).await?.is_some() {
            debug!(vault = %address, "Vault already provisioned, replay ignored");
            return Ok(());
        }

        let vault = Vault {
            id: address,
            owner_token_id: transfer.token_id,
            originating_collection: transfer.collection,
        };
        self.store.vaults().insert_vault(&vault).await?;

        info!(
            vault = %address,
            collection = %transfer.collection,
            token_id = %u256_hex(&transfer.token_id),
            "🏦 Vault provisioned"
        );
        record_vault_provisioned();
        Ok(())
    }
}
