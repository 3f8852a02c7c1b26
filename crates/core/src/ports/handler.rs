//! Port trait for event-shape handlers.
//!
//! This is the main extensibility point for the reconciler. Each token
//! standard whose events need custody accounting implements this trait.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DomainResult;
use crate::models::{EventKind, LedgerEvent};

/// Trait for event-shape handlers.
///
/// A handler reconciles every event of its kind: it resolves descriptors,
/// runs provisioning where applicable, and mutates balance or custody
/// records through the entity store. Handlers are invoked strictly
/// sequentially by the router and may assume no concurrent store access.
///
/// Guards (self-transfer, zero value) run in the router before dispatch;
/// a handler never sees a guarded event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Event kind this handler processes.
    fn kind(&self) -> EventKind;

    /// Reconcile one event.
    ///
    /// Returns `Err` only for infrastructure failures (store errors).
    /// Inconsistent ledger state is logged and skipped inside the
    /// handler, never propagated.
    async fn handle(&self, event: &LedgerEvent) -> DomainResult<()>;
}

/// Registry for event handlers.
pub struct HandlerRegistry {
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for its event kind.
    ///
    /// Registering a second handler for the same kind replaces the first.
    pub fn register(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    /// Get the handler for an event kind.
    pub fn get(&self, kind: EventKind) -> Option<&Arc<dyn EventHandler>> {
        self.handlers.get(&kind)
    }

    /// Check if an event kind has a registered handler.
    pub fn has_handler(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// List all registered event kinds.
    pub fn registered_kinds(&self) -> Vec<EventKind> {
        self.handlers.keys().copied().collect()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
