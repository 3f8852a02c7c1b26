//! Domain models for the custody reconciler.
//!
//! These models are storage-agnostic and represent the canonical form of
//! ledger events and custody entities within the domain layer.

mod entities;

pub use entities::*;

use serde::{Deserialize, Serialize};

pub use primitive_types::U256;

// =============================================================================
// Byte Newtypes
// =============================================================================

/// Macro to generate fixed-size byte newtypes with common functionality.
///
/// Generates:
/// - `from_hex()` - Parse from hex string (with or without 0x prefix)
/// - `to_hex()` - Convert to 0x-prefixed lowercase hex string
/// - `Display` trait implementation
/// - `From<[u8; N]>` implementation
macro_rules! bytes_newtype {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Parse from hex string (with or without 0x prefix).
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let s = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(s)?;
                let arr: [u8; $len] = bytes
                    .try_into()
                    .map_err(|_| hex::FromHexError::InvalidStringLength)?;
                Ok(Self(arr))
            }

            /// Convert to 0x-prefixed lowercase hex string.
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }

            /// Get the inner bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

bytes_newtype!(
    /// 20-byte ledger address (token contract, holder, or vault).
    Address,
    20
);

bytes_newtype!(
    /// 32-byte transaction hash.
    TxHash,
    32
);

impl Address {
    /// The all-zero address. Conventionally the "minted" / "burned"
    /// sentinel, but the engine never hardcodes that meaning: the null
    /// address used by the provisioning rule is injected configuration.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Whether this is the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

/// Render a U256 as a 0x-prefixed lowercase hex string.
///
/// Used for composite-key components: hex never contains the `-` key
/// delimiter, so encoded ids are always safe to concatenate.
pub fn u256_hex(value: &U256) -> String {
    format!("{value:#x}")
}

// =============================================================================
// Event Shapes
// =============================================================================

/// Position of an event in the canonical ledger order.
///
/// Block order, then intra-block log order. Carried for log/trace
/// identification only; the engine relies on the event source for
/// ordering and never reorders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    /// Block number containing the event.
    pub block_number: u64,
    /// Transaction hash containing the event.
    pub tx_hash: TxHash,
    /// Log index within the block.
    pub log_index: u32,
}

impl EventMeta {
    /// Unique identifier: block_number-log_index.
    pub fn id(&self) -> String {
        format!("{}-{}", self.block_number, self.log_index)
    }
}

/// Fungible `Transfer(from, to, value)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FungibleTransfer {
    /// Emitting token contract.
    pub token: Address,
    pub from: Address,
    pub to: Address,
    /// Amount transferred (smallest unit).
    pub value: U256,
    pub meta: EventMeta,
}

/// Non-fungible `Transfer(from, to, tokenId)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonFungibleTransfer {
    /// Emitting collection contract.
    pub collection: Address,
    pub from: Address,
    pub to: Address,
    pub token_id: U256,
    pub meta: EventMeta,
}

/// Semi-fungible `TransferSingle(operator, from, to, id, value)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemiFungibleTransferSingle {
    /// Emitting multi-token contract.
    pub token: Address,
    pub operator: Address,
    pub from: Address,
    pub to: Address,
    pub id: U256,
    pub value: U256,
    pub meta: EventMeta,
}

/// Semi-fungible `TransferBatch(operator, from, to, ids, values)`.
///
/// `ids` and `values` are paired by index and must have equal length;
/// a mismatch is treated as inconsistent state by the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemiFungibleTransferBatch {
    /// Emitting multi-token contract.
    pub token: Address,
    pub operator: Address,
    pub from: Address,
    pub to: Address,
    pub ids: Vec<U256>,
    pub values: Vec<U256>,
    pub meta: EventMeta,
}

/// `ControlledCollectionCreated(token)` - a new non-fungible collection
/// flagged as vault-bearing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionCreated {
    /// The created collection contract.
    pub collection: Address,
    pub meta: EventMeta,
}

/// One ledger event, in one of the five consumed shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    Fungible(FungibleTransfer),
    NonFungible(NonFungibleTransfer),
    SemiFungibleSingle(SemiFungibleTransferSingle),
    SemiFungibleBatch(SemiFungibleTransferBatch),
    CollectionCreated(CollectionCreated),
}

impl LedgerEvent {
    /// The handler-dispatch kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Fungible(_) => EventKind::Fungible,
            Self::NonFungible(_) => EventKind::NonFungible,
            Self::SemiFungibleSingle(_) | Self::SemiFungibleBatch(_) => EventKind::SemiFungible,
            Self::CollectionCreated(_) => EventKind::NonFungible,
        }
    }

    /// Ledger position of this event.
    pub fn meta(&self) -> &EventMeta {
        match self {
            Self::Fungible(e) => &e.meta,
            Self::NonFungible(e) => &e.meta,
            Self::SemiFungibleSingle(e) => &e.meta,
            Self::SemiFungibleBatch(e) => &e.meta,
            Self::CollectionCreated(e) => &e.meta,
        }
    }
}

/// Dispatch key for event handlers.
///
/// `CollectionCreated` routes to the non-fungible handler: it mutates the
/// same descriptor family as non-fungible transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Fungible,
    NonFungible,
    SemiFungible,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Fungible => "fungible",
            Self::NonFungible => "non_fungible",
            Self::SemiFungible => "semi_fungible",
        };
        write!(f, "{s}")
    }
}

// =============================================================================
// Tests
// =============================================================================
