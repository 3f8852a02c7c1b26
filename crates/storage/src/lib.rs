//! Storage layer for the Custodia reconciler.
//!
//! This crate provides implementations of the entity store traits defined
//! in `custodia-core`:
//!
//! - [`postgres`] - PostgreSQL store for production (connection pooling,
//!   migrations, CRUD)
//! - [`memory`] - in-memory store for engine tests and local smoke runs
//!
//! # Usage
//!
//! ```ignore
//! use custodia_storage::{Database, DatabaseConfig, PgEntityStore};
//!
//! // Connect to the database
//! let config = DatabaseConfig::for_reconciler(&database_url);
//! let db = Database::connect(&config).await?;
//!
//! // Run migrations
//! db.migrate().await?;
//!
//! // Create the entity store
//! let store = Arc::new(PgEntityStore::new(Arc::new(db)));
//! ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{Database, DatabaseConfig, PgEntityStore, PurgeStats};
