//! Event router service - orchestrates custody reconciliation.
//!
//! The service consumes the ordered ledger event stream, applies the
//! no-op guards, and dispatches each event to the handler registered for
//! its kind. Processing is strictly sequential: one event is fully
//! reconciled (all entity loads, external reads, and store writes)
//! before the next begins, because balance correctness depends on strict
//! sequential application.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::{EngineError, EngineResult};
use crate::metrics::{ProcessingTimer, record_event_processed, record_event_skipped};
use crate::models::LedgerEvent;
use crate::ports::{EventSource, HandlerRegistry};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the reconciler service.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Initial delay before resubscribing after a delivery fault.
    pub initial_retry_delay: Duration,
    /// Upper bound for the exponential resubscribe backoff.
    pub max_retry_delay: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            initial_retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(30),
        }
    }
}

// =============================================================================
// Guards
// =============================================================================

/// Reason an event was skipped without touching any record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `to == from` - a self-transfer never moves custody.
    SelfTransfer,
    /// Transferred amount/value is zero.
    ZeroValue,
}

impl SkipReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::SelfTransfer => "self_transfer",
            Self::ZeroValue => "zero_value",
        }
    }
}

/// Evaluate the no-op guards for an event.
///
/// Runs before any resolver or store access: a guarded event must not
/// mutate any balance, custody record, or even descriptor existence.
/// Zero-value pairs inside a batch are filtered per-pair by the
/// semi-fungible handler instead, so a batch is only guarded here when
/// it cannot move anything at all.
fn skip_reason(event: &LedgerEvent) -> Option<SkipReason> {
    match event {
        LedgerEvent::Fungible(t) => {
            if t.from == t.to {
                Some(SkipReason::SelfTransfer)
            } else if t.value.is_zero() {
                Some(SkipReason::ZeroValue)
            } else {
                None
            }
        }
        LedgerEvent::NonFungible(t) => (t.from == t.to).then_some(SkipReason::SelfTransfer),
        LedgerEvent::SemiFungibleSingle(t) => {
            if t.from == t.to {
                Some(SkipReason::SelfTransfer)
            } else if t.value.is_zero() {
                Some(SkipReason::ZeroValue)
            } else {
                None
            }
        }
        LedgerEvent::SemiFungibleBatch(t) => {
            if t.from == t.to {
                Some(SkipReason::SelfTransfer)
            } else if t.values.iter().all(|v| v.is_zero()) {
                Some(SkipReason::ZeroValue)
            } else {
                None
            }
        }
        LedgerEvent::CollectionCreated(_) => None,
    }
}

// =============================================================================
// ReconcilerService
// =============================================================================

/// Main reconciliation service.
///
/// # Flow
///
/// 1. Subscribe to the ordered event stream
/// 2. For each event, evaluate the guards
/// 3. Dispatch to the handler registered for the event's kind
/// 4. On a delivery fault, resubscribe with exponential backoff
///
/// A failed event (store error) is logged and the stream continues; the
/// engine never aborts the stream.
pub struct ReconcilerService<S: EventSource> {
    config: ReconcilerConfig,
    source: Arc<S>,
    handlers: Arc<HandlerRegistry>,
}

impl<S: EventSource> ReconcilerService<S> {
    pub fn new(config: ReconcilerConfig, source: Arc<S>, handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            config,
            source,
            handlers,
        }
    }

    /// Start the reconciler.
    ///
    /// Consumes ledger events until shutdown is requested.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> EngineResult<()> {
        info!("⛓️  Starting reconciler");

        let head = self.source.latest_block().await?;
        debug!(head = head, "Ledger head detected");

        let mut retry_delay = self.config.initial_retry_delay;

        loop {
            if *shutdown_rx.borrow() {
                debug!("Shutdown requested");
                return Err(EngineError::ShutdownRequested);
            }

            match self.source.subscribe().await {
                Ok(mut stream) => {
                    debug!("📡 Event subscription established");
                    retry_delay = self.config.initial_retry_delay; // Reset backoff on success

                    while let Some(result) = stream.next().await {
                        if *shutdown_rx.borrow() {
                            debug!("Shutdown requested");
                            return Err(EngineError::ShutdownRequested);
                        }

                        match result {
                            Ok(event) => self.process_event(&event).await,
                            Err(e) => {
                                warn!(error = ?e, "⚠️  Delivery fault, resubscribing...");
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        error = ?e,
                        retry_in_ms = retry_delay.as_millis(),
                        "⚠️  Failed to subscribe, retrying..."
                    );
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(retry_delay) => {
                    debug!(retry_delay_ms = retry_delay.as_millis(), "🔄 Reconnecting to ledger...");
                    retry_delay = (retry_delay * 2).min(self.config.max_retry_delay);
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        return Err(EngineError::ShutdownRequested);
                    }
                }
            }
        }
    }

    /// Reconcile a single event: guards, then handler dispatch.
    ///
    /// Never returns an error: a handler failure is logged and the
    /// stream continues, so one bad event cannot halt processing.
    ///
    /// Public for tests and replay tooling that drive the engine one
    /// event at a time; [`run`](Self::run) uses it for every delivered
    /// event.
    #[instrument(skip(self, event), fields(event = %event.meta().id()))]
    pub async fn process_event(&self, event: &LedgerEvent) {
        if let Some(reason) = skip_reason(event) {
            trace!(reason = reason.as_str(), "Event skipped by guard");
            record_event_skipped(reason.as_str());
            return;
        }

        let kind = event.kind();
        let Some(handler) = self.handlers.get(kind) else {
            trace!(kind = %kind, "No handler registered, ignoring event");
            return;
        };

        let _timer = ProcessingTimer::new();
        match handler.handle(event).await {
            Ok(()) => {
                trace!(kind = %kind, "Event reconciled");
                record_event_processed(&kind.to_string());
            }
            Err(e) => {
                error!(kind = %kind, error = ?e, "❌ Event reconciliation failed");
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Address, CollectionCreated, EventMeta, FungibleTransfer, NonFungibleTransfer,
        SemiFungibleTransferBatch, SemiFungibleTransferSingle, TxHash, U256,
    };

    fn meta() -> EventMeta {
        EventMeta {
            block_number: 1,
            tx_hash: TxHash([0u8; 32]),
            log_index: 0,
        }
    }

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn guard_skips_self_transfer() {
        let event = LedgerEvent::Fungible(FungibleTransfer {
            token: addr(1),
            from: addr(2),
            to: addr(2),
            value: U256::from(100u64),
            meta: meta(),
        });
        assert_eq!(skip_reason(&event), Some(SkipReason::SelfTransfer));
    }

    #[test]
    fn guard_skips_zero_value() {
        let event = LedgerEvent::Fungible(FungibleTransfer {
            token: addr(1),
            from: addr(2),
            to: addr(3),
            value: U256::zero(),
            meta: meta(),
        });
        assert_eq!(skip_reason(&event), Some(SkipReason::ZeroValue));
    }

    // Test critique: le self-transfer prime sur la valeur nulle, l'événement
    // est de toute façon un no-op
    #[test]
    fn guard_self_transfer_takes_precedence() {
        let event = LedgerEvent::SemiFungibleSingle(SemiFungibleTransferSingle {
            token: addr(1),
            operator: addr(9),
            from: addr(2),
            to: addr(2),
            id: U256::from(5u64),
            value: U256::zero(),
            meta: meta(),
        });
        assert_eq!(skip_reason(&event), Some(SkipReason::SelfTransfer));
    }

    #[test]
    fn guard_passes_regular_transfer() {
        let event = LedgerEvent::Fungible(FungibleTransfer {
            token: addr(1),
            from: addr(2),
            to: addr(3),
            value: U256::from(1u64),
            meta: meta(),
        });
        assert_eq!(skip_reason(&event), None);
    }

    #[test]
    fn guard_non_fungible_has_no_zero_value() {
        // Le token id 0 est un identifiant valide, pas une valeur nulle
        let event = LedgerEvent::NonFungible(NonFungibleTransfer {
            collection: addr(1),
            from: addr(2),
            to: addr(3),
            token_id: U256::zero(),
            meta: meta(),
        });
        assert_eq!(skip_reason(&event), None);
    }

    #[test]
    fn guard_batch_all_zero_values() {
        let base = SemiFungibleTransferBatch {
            token: addr(1),
            operator: addr(9),
            from: addr(2),
            to: addr(3),
            ids: vec![U256::from(5u64), U256::from(9u64)],
            values: vec![U256::zero(), U256::zero()],
            meta: meta(),
        };
        assert_eq!(
            skip_reason(&LedgerEvent::SemiFungibleBatch(base.clone())),
            Some(SkipReason::ZeroValue)
        );

        // Une seule valeur non nulle suffit pour passer
        let mixed = SemiFungibleTransferBatch {
            values: vec![U256::zero(), U256::from(4u64)],
            ..base
        };
        assert_eq!(skip_reason(&LedgerEvent::SemiFungibleBatch(mixed)), None);
    }

    #[test]
    fn guard_passes_collection_created() {
        let event = LedgerEvent::CollectionCreated(CollectionCreated {
            collection: addr(1),
            meta: meta(),
        });
        assert_eq!(skip_reason(&event), None);
    }
}
