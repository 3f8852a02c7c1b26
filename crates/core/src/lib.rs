//! Core domain layer for the Custodia reconciler.
//!
//! This crate contains the domain models, port traits (interfaces), and
//! business logic services for the vault custody reconciliation engine. It
//! follows hexagonal architecture principles - this is the innermost layer
//! with no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    custodia (binary)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  custodia-graphql  │  custodia-handlers  │   custodia-evm   │
//! │      (API)         │      (engine)       │      (RPC)       │
//! ├────────────────────┴─────────────────────┴──────────────────┤
//! │                    custodia-storage                         │
//! │                     (PostgreSQL)                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    custodia-core  ← YOU ARE HERE            │
//! │               (models, ports, services)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (addresses, events, custody entities)
//! - [`ports`] - Interface traits for adapters to implement
//! - [`services`] - Core business logic (ReconcilerService)
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Key Concepts
//!
//! ## Ports
//!
//! Ports define interfaces that external adapters must implement:
//!
//! - [`ports::EventSource`] - Deliver token-transfer events in canonical
//!   ledger order
//! - [`ports::TokenReader`] - Fallible read-only calls against token
//!   contracts (a revert is a normal outcome, never an error)
//! - [`ports::EntityStore`] - Persist and query custody entities
//! - [`ports::EventHandler`] - Reconcile one event shape
//!
//! ## Reconciliation Lifecycle
//!
//! 1. Subscribe to the ordered event stream
//! 2. Apply the self-transfer and zero-value guards
//! 3. Dispatch to the registered handler for the event's kind
//! 4. The handler resolves descriptors, provisions vaults, and mutates
//!    balance/custody records through the entity store
//!
//! Processing is strictly sequential: one event is fully reconciled
//! before the next begins.

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;
