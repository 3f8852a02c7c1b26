//! Persisted custody entities.
//!
//! All entities are keyed by a unique string identifier: a lowercase
//! 0x-hex address, or a composite of hex-encoded components joined by
//! `-`. The delimiter can never appear inside a component.
//!
//! Lifecycle invariants:
//!
//! - Descriptor entities ([`FungibleToken`], [`NonFungibleToken`],
//!   [`SemiFungibleToken`]) are created lazily on first observed event
//!   referencing their contract, never deleted, never mutated after
//!   initial population.
//! - [`Vault`] is created exactly once by the provisioning rule and never
//!   mutated or deleted thereafter.
//! - Balance and custody records are created on first inflow, mutated on
//!   every subsequent flow, and deleted exactly when a decrement reaches
//!   zero (balances) or the tracked item leaves the vault (custody).

use serde::{Deserialize, Serialize};

use super::{Address, U256, u256_hex};

/// The composite-key delimiter.
pub const KEY_DELIMITER: &str = "-";

// =============================================================================
// Descriptors
// =============================================================================

/// Descriptor for a fungible token contract.
///
/// Each metadata attribute is populated independently from the external
/// reader; a reverted read leaves the attribute unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleToken {
    /// Contract address (entity key).
    pub id: Address,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u32>,
}

/// Descriptor for a non-fungible collection contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonFungibleToken {
    /// Contract address (entity key).
    pub id: Address,
    pub name: Option<String>,
    pub base_uri: Option<String>,
    /// Whether this collection mints vault-backing tokens. Fixed at
    /// creation; never flips.
    pub is_vault: bool,
}

/// Descriptor for a semi-fungible (multi-token) contract.
///
/// Carries no externally read attributes; its existence implies at least
/// one balance record references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemiFungibleToken {
    /// Contract address (entity key).
    pub id: Address,
}

// =============================================================================
// Vault
// =============================================================================

/// A custodial sub-account whose address is deterministically computable
/// from its originating collection and token id.
///
/// The address is computed counterfactually: the vault contract may not
/// yet have code deployed there, but custody is tracked regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Computed vault address (entity key).
    pub id: Address,
    /// Token id of the mint that provisioned this vault.
    pub owner_token_id: U256,
    /// Collection whose mint provisioned this vault.
    pub originating_collection: Address,
}

// =============================================================================
// Balances & Custody
// =============================================================================

/// Fungible balance held by a vault, keyed `vault-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleBalance {
    /// Composite key: `vault.to_hex() + "-" + token.to_hex()`.
    pub id: String,
    pub vault: Address,
    pub token: Address,
    /// Non-negative; a zero balance is pruned, never stored.
    pub balance: U256,
}

impl FungibleBalance {
    /// Build the composite key for a (vault, token) pair.
    pub fn key(vault: &Address, token: &Address) -> String {
        format!("{}{KEY_DELIMITER}{}", vault.to_hex(), token.to_hex())
    }

    /// Create a fresh record for the first observed inflow.
    pub fn new(vault: Address, token: Address, balance: U256) -> Self {
        Self {
            id: Self::key(&vault, &token),
            vault,
            token,
            balance,
        }
    }
}

/// Semi-fungible balance held by a vault, keyed `token-tokenId-vault`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemiFungibleBalance {
    /// Composite key:
    /// `token.to_hex() + "-" + token_id hex + "-" + vault.to_hex()`.
    pub id: String,
    pub token: Address,
    /// Sub-id within the multi-token contract.
    pub token_id: U256,
    pub vault: Address,
    /// Non-negative; a zero balance is pruned, never stored.
    pub balance: U256,
}

impl SemiFungibleBalance {
    /// Build the composite key for a (token, token_id, vault) triple.
    pub fn key(token: &Address, token_id: &U256, vault: &Address) -> String {
        format!(
            "{}{KEY_DELIMITER}{}{KEY_DELIMITER}{}",
            token.to_hex(),
            u256_hex(token_id),
            vault.to_hex()
        )
    }

    /// Create a fresh record for the first observed inflow.
    pub fn new(token: Address, token_id: U256, vault: Address, balance: U256) -> Self {
        Self {
            id: Self::key(&token, &token_id, &vault),
            token,
            token_id,
            vault,
            balance,
        }
    }
}

/// Ownership record for one non-fungible token parked in a vault, keyed
/// `collection-tokenId`.
///
/// Tracked per-token rather than as a vault-owned list, so a hand-off
/// is one delete plus one insert instead of two array scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonFungibleCustody {
    /// Composite key: `collection.to_hex() + "-" + token_id hex`.
    pub id: String,
    pub collection: Address,
    pub token_id: U256,
    /// The vault currently holding the token.
    pub holder: Address,
}

impl NonFungibleCustody {
    /// Build the composite key for a (collection, token_id) pair.
    pub fn key(collection: &Address, token_id: &U256) -> String {
        format!(
            "{}{KEY_DELIMITER}{}",
            collection.to_hex(),
            u256_hex(token_id)
        )
    }

    /// Create a custody record held by `holder`.
    pub fn new(collection: Address, token_id: U256, holder: Address) -> Self {
        Self {
            id: Self::key(&collection, &token_id),
            collection,
            token_id,
            holder,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn fungible_balance_key_is_vault_then_token() {
        let key = FungibleBalance::key(&addr(0xaa), &addr(0xbb));
        assert_eq!(
            key,
            format!("0x{}-0x{}", "aa".repeat(20), "bb".repeat(20))
        );
    }

    #[test]
    fn semi_fungible_balance_key_order() {
        // token, puis sub-id, puis vault
        let key = SemiFungibleBalance::key(&addr(0x01), &U256::from(9u64), &addr(0x02));
        assert_eq!(
            key,
            format!("0x{}-0x9-0x{}", "01".repeat(20), "02".repeat(20))
        );
    }

    #[test]
    fn custody_key_is_collection_then_token_id() {
        let key = NonFungibleCustody::key(&addr(0xcc), &U256::from(255u64));
        assert_eq!(key, format!("0x{}-0xff", "cc".repeat(20)));
    }

    // Test critique: deux paires distinctes ne peuvent pas produire la même
    // clé, le délimiteur n'apparaissant jamais dans un composant hex
    #[test]
    fn composite_keys_are_unambiguous() {
        let a = FungibleBalance::key(&addr(0x01), &addr(0x02));
        let b = FungibleBalance::key(&addr(0x02), &addr(0x01));
        assert_ne!(a, b);
        assert_eq!(a.matches(KEY_DELIMITER).count(), 1);
    }

    #[test]
    fn new_record_ids_match_keys() {
        let balance = FungibleBalance::new(addr(1), addr(2), U256::from(10u64));
        assert_eq!(balance.id, FungibleBalance::key(&addr(1), &addr(2)));

        let custody = NonFungibleCustody::new(addr(3), U256::from(7u64), addr(4));
        assert_eq!(custody.id, NonFungibleCustody::key(&addr(3), &U256::from(7u64)));
    }
}
