//! GraphQL API for the Custodia reconciler.
//!
//! Provides a read-only GraphQL endpoint over the entity store: vaults,
//! balances, custody records and token descriptors. Downstream consumers
//! see the cumulative effect of every reconciled event; the API performs
//! no writes.

mod schema;
mod server;
mod types;

pub use schema::{CustodyQuery, build_schema, MAX_QUERY_COMPLEXITY, MAX_QUERY_DEPTH};
pub use server::{ServerConfig, serve, serve_with_shutdown};
pub use types::CustodiaSchema;
