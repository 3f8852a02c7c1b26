//! Port trait for the event-delivery collaborator.
//!
//! This trait defines the interface for receiving token-transfer events
//! from the underlying ledger. Implementations live in the infrastructure
//! layer (e.g., `custodia-evm`).
//!
//! The collaborator guarantees delivery in canonical ledger order (block
//! order, then transaction order, then intra-transaction log order). The
//! engine assumes and preserves that order; it never reorders, batches,
//! or parallelizes.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::ChainResult;
use crate::models::LedgerEvent;

/// Stream of ledger events in canonical order.
pub type LedgerEventStream = Pin<Box<dyn Stream<Item = ChainResult<LedgerEvent>> + Send>>;

/// Port trait for the ledger event source.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Current head block number of the connected ledger.
    async fn latest_block(&self) -> ChainResult<u64>;

    /// Subscribe to the ordered event stream.
    ///
    /// A stream item that is `Err` signals a delivery fault; the consumer
    /// is expected to resubscribe. Events already yielded are never
    /// re-yielded by the same subscription.
    async fn subscribe(&self) -> ChainResult<LedgerEventStream>;
}
