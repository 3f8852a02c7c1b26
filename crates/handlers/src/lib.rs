//! Reconciliation engine for the Custodia indexer.
//!
//! This crate implements the custody accounting logic behind the
//! [`EventHandler`](custodia_core::ports::EventHandler) port: one
//! handler per token standard, sharing the entity resolver, the vault
//! provisioning rule, and the balance ledger algorithm.
//!
//! # Components
//!
//! - [`resolver::EntityResolver`] - idempotent load-or-create for token
//!   descriptors, tolerant of reverted metadata reads
//! - [`provisioning::VaultProvisioner`] - creates a vault record when a
//!   qualifying mint is observed
//! - [`ledger`] - the accumulate/decrement/prune balance algorithm,
//!   shared by both balance families
//! - [`FungibleHandler`], [`NonFungibleHandler`], [`SemiFungibleHandler`]
//!   - per-standard reconciliation
//!
//! # Wiring
//!
//! ```ignore
//! use custodia_handlers::build_registry;
//!
//! let handlers = build_registry(store, reader, null_address);
//! let service = ReconcilerService::new(config, source, Arc::new(handlers));
//! ```

pub mod ledger;
pub mod provisioning;
pub mod resolver;

mod fungible;
mod non_fungible;
mod semi_fungible;

pub use fungible::FungibleHandler;
pub use non_fungible::NonFungibleHandler;
pub use semi_fungible::SemiFungibleHandler;

use std::sync::Arc;

use custodia_core::models::Address;
use custodia_core::ports::{EntityStore, HandlerRegistry, TokenReader};

use provisioning::VaultProvisioner;
use resolver::EntityResolver;

/// Build a handler registry covering all five consumed event shapes.
///
/// `null_address` is the ledger's "minted" sentinel, injected here rather
/// than embedded as a literal so tests can substitute their own.
pub fn build_registry(
    store: Arc<dyn EntityStore>,
    reader: Arc<dyn TokenReader>,
    null_address: Address,
) -> HandlerRegistry {
    let resolver = Arc::new(EntityResolver::new(store.clone(), reader.clone()));
    let provisioner = Arc::new(VaultProvisioner::new(store.clone(), reader, null_address));

    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(FungibleHandler::new(store.clone(), resolver.clone())));
    registry.register(Arc::new(NonFungibleHandler::new(
        store.clone(),
        resolver.clone(),
        provisioner,
    )));
    registry.register(Arc::new(SemiFungibleHandler::new(store, resolver)));
    registry
}
