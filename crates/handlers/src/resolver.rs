//! Idempotent load-or-create resolution of token descriptors.
//!
//! The resolver populates descriptor attributes from the external reader.
//! Each attribute is read independently: a revert on one attribute must
//! not block population of the others - it leaves that attribute unset
//! and the enclosing event continues unaffected.

use std::sync::Arc;

use tracing::{debug, info};

use custodia_core::error::DomainResult;
use custodia_core::metrics::record_read_revert;
use custodia_core::models::{Address, FungibleToken, NonFungibleToken, SemiFungibleToken};
use custodia_core::ports::{
    EntityStore, FungibleTokenStore, NonFungibleTokenStore, ReadResult, Reverted,
    SemiFungibleTokenStore, TokenReader,
};

/// Resolves token descriptors, creating them lazily on first reference.
///
/// Idempotent: resolving the same address twice with no intervening event
/// yields the same record unchanged. Descriptors are never mutated after
/// initial population.
pub struct EntityResolver {
    store: Arc<dyn EntityStore>,
    reader: Arc<dyn TokenReader>,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn EntityStore>, reader: Arc<dyn TokenReader>) -> Self {
        Self { store, reader }
    }

    /// Resolve a fungible token descriptor.
    pub async fn resolve_fungible(&self, address: &Address) -> DomainResult<FungibleToken> {
        if let Some(existing) = self
            .store
            .fungible_tokens()
            .get_fungible_token(address)
            .await?
        {
            return Ok(existing);
        }

        let token = FungibleToken {
            id: *address,
            name: unset_on_revert(self.reader.try_name(address).await, address, "name"),
            symbol: unset_on_revert(self.reader.try_symbol(address).await, address, "symbol"),
            decimals: unset_on_revert(self.reader.try_decimals(address).await, address, "decimals"),
        };

        self.store
            .fungible_tokens()
            .upsert_fungible_token(&token)
            .await?;
        debug!(token = %address, "Fungible descriptor created");
        Ok(token)
    }

    /// Resolve a non-fungible collection descriptor.
    ///
    /// `vault_hint` seeds `is_vault` on the create path only; an existing
    /// descriptor keeps its flag (it never flips).
    pub async fn resolve_non_fungible(
        &self,
        address: &Address,
        vault_hint: bool,
    ) -> DomainResult<NonFungibleToken> {
        if let Some(existing) = self
            .store
            .non_fungible_tokens()
            .get_non_fungible_token(address)
            .await?
        {
            return Ok(existing);
        }

        let token = NonFungibleToken {
            id: *address,
            name: unset_on_revert(self.reader.try_name(address).await, address, "name"),
            base_uri: unset_on_revert(self.reader.try_base_uri(address).await, address, "base_uri"),
            is_vault: vault_hint,
        };

        self.store
            .non_fungible_tokens()
            .upsert_non_fungible_token(&token)
            .await?;
        debug!(collection = %address, is_vault = vault_hint, "Non-fungible descriptor created");
        Ok(token)
    }

    /// Resolve a semi-fungible descriptor. No externally read attributes.
    pub async fn resolve_semi_fungible(
        &self,
        address: &Address,
    ) -> DomainResult<SemiFungibleToken> {
        if let Some(existing) = self
            .store
            .semi_fungible_tokens()
            .get_semi_fungible_token(address)
            .await?
        {
            return Ok(existing);
        }

        let token = SemiFungibleToken { id: *address };
        self.store
            .semi_fungible_tokens()
            .upsert_semi_fungible_token(&token)
            .await?;
        debug!(token = %address, "Semi-fungible descriptor created");
        Ok(token)
    }
}

/// Map a reverted read to an unset attribute, keeping the create path
/// going.
fn unset_on_revert<T>(result: ReadResult<T>, token: &Address, attribute: &'static str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(Reverted) => {
            info!(token = %token, attribute, "External read reverted, attribute left unset");
            record_read_revert(attribute);
            None
        }
    }
}
