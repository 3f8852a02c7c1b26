//! Error types for the reconciler domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`DomainError`] - Business logic errors
//! - [`StorageError`] - Entity store errors
//! - [`ChainError`] - Ledger RPC errors
//! - [`EngineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Note that a reverted external read is NOT an error: it is modeled as
//! [`crate::ports::Reverted`] and handled as normal control flow, because
//! a non-compliant token contract must never abort reconciliation.

use thiserror::Error;

// =============================================================================
// Domain Errors
// =============================================================================

/// Business logic and domain rule violations.
///
/// These errors represent problems in the engine's domain logic, such as
/// malformed event payloads or validation failures. Inconsistent ledger
/// state (an outflow with no recorded balance) is deliberately NOT a
/// variant here: it is logged and skipped, never propagated.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Address failed validation.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Event payload decoding failed.
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// No handler registered for an event kind.
    #[error("Handler not found for event kind: {0}")]
    HandlerNotFound(String),

    /// Generic validation error.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Entity store errors.
///
/// These errors originate from store operations like queries,
/// transactions, and data serialization.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// Query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Database constraint was violated (unique, foreign key, etc.).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Transaction commit/rollback failed.
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Data serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Chain Errors
// =============================================================================

/// Ledger RPC and connectivity errors.
///
/// These errors occur when communicating with the ledger node. They are
/// internal to the event-source adapter and never surface as a failed
/// event: the source reconnects and resumes.
#[derive(Debug, Error)]
pub enum ChainError {
    /// HTTP connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// RPC request failed.
    #[error("RPC error: {0}")]
    RpcError(String),

    /// Event subscription failed or disconnected.
    #[error("Subscription error: {0}")]
    SubscriptionError(String),

    /// A log payload could not be decoded into an event shape.
    #[error("Log decode error: {0}")]
    LogDecodeError(String),
}

// =============================================================================
// Engine Errors
// =============================================================================

/// Top-level reconciler orchestration errors.
///
/// This is the main error type returned by
/// [`crate::services::ReconcilerService`]. It wraps all lower-level errors
/// and adds orchestration-specific variants.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Domain logic error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Entity store error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Ledger connectivity error.
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Graceful shutdown was requested.
    ///
    /// This is not really an error but uses the error type for control flow.
    #[error("Reconciler shutdown requested")]
    ShutdownRequested,

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    // Test critique: la chaîne de conversion d'erreurs fonctionne
    // Permet d'utiliser ? à travers les couches
    #[test]
    fn test_error_conversion_chain() {
        // Storage -> Domain -> Engine
        let storage_err = StorageError::QueryError("db failed".into());
        let domain_err: DomainError = storage_err.into();
        let engine_err: EngineError = domain_err.into();

        // Le message original est préservé
        assert!(engine_err.to_string().contains("db failed"));

        // Chain -> Engine
        let chain_err = ChainError::RpcError("rpc failed".into());
        let engine_err: EngineError = chain_err.into();
        assert!(engine_err.to_string().contains("rpc failed"));
    }

    #[test]
    fn test_shutdown_is_distinguishable() {
        let err = EngineError::ShutdownRequested;
        assert!(matches!(err, EngineError::ShutdownRequested));
    }
}
