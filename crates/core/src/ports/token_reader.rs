//! Port trait for fallible read-only token-contract queries.
//!
//! Every read either returns a value or signals [`Reverted`]. A revert is
//! a normal, expected outcome - it represents a non-standard-compliant
//! contract - and must never abort the surrounding operation. Callers
//! leave the corresponding attribute unset and continue.
//!
//! Implementations may be a network client in production
//! (`custodia-evm`) or a scripted stub in tests.

use async_trait::async_trait;

use crate::models::{Address, U256};

/// Marker for a reverted external read.
///
/// Deliberately carries no payload: the engine reacts identically to
/// every revert (skip the attribute, keep going), and the adapter owns
/// whatever diagnostic detail exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reverted;

impl std::fmt::Display for Reverted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "reverted")
    }
}

/// Result of a fallible external read.
pub type ReadResult<T> = Result<T, Reverted>;

/// Port trait for read-only token-contract calls.
#[async_trait]
pub trait TokenReader: Send + Sync {
    /// Token name (fungible and non-fungible).
    async fn try_name(&self, token: &Address) -> ReadResult<String>;

    /// Token symbol (fungible).
    async fn try_symbol(&self, token: &Address) -> ReadResult<String>;

    /// Token decimals (fungible).
    async fn try_decimals(&self, token: &Address) -> ReadResult<u32>;

    /// Collection base metadata URI (non-fungible).
    async fn try_base_uri(&self, collection: &Address) -> ReadResult<String>;

    /// Deterministic vault address for a (collection, token id) pair.
    ///
    /// The address is computed counterfactually by the collection's
    /// controller; it is valid even before any code is deployed there.
    async fn try_compute_vault_address(
        &self,
        collection: &Address,
        token_id: &U256,
    ) -> ReadResult<Address>;
}
