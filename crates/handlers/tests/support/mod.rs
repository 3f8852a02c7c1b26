//! Shared test fixtures: a scripted token reader, a silent event source,
//! and a harness that routes events through the real reconciler service.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use custodia_core::error::ChainResult;
use custodia_core::models::{
    Address, CollectionCreated, EventMeta, FungibleTransfer, LedgerEvent, NonFungibleTransfer,
    SemiFungibleTransferBatch, SemiFungibleTransferSingle, TxHash, U256,
};
use custodia_core::ports::{
    EntityStore, EventSource, LedgerEventStream, ReadResult, Reverted, TokenReader,
};
use custodia_core::services::{ReconcilerConfig, ReconcilerService};
use custodia_handlers::build_registry;
use custodia_storage::MemoryStore;

/// The "minted" sentinel used by every test harness.
pub const NULL_ADDRESS: Address = Address::ZERO;

pub fn addr(byte: u8) -> Address {
    Address([byte; 20])
}

pub fn meta(log_index: u32) -> EventMeta {
    EventMeta {
        block_number: 1,
        tx_hash: TxHash([0xab; 32]),
        log_index,
    }
}

// =============================================================================
// Scripted reader
// =============================================================================

/// Scripted [`TokenReader`]: an attribute that was not scripted reverts,
/// exactly like a non-compliant contract.
#[derive(Default)]
pub struct StubReader {
    names: HashMap<Address, String>,
    symbols: HashMap<Address, String>,
    decimals: HashMap<Address, u32>,
    base_uris: HashMap<Address, String>,
    vault_addresses: HashMap<(Address, U256), Address>,
}

impl StubReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, token: Address, name: &str) -> Self {
        self.names.insert(token, name.to_string());
        self
    }

    pub fn with_symbol(mut self, token: Address, symbol: &str) -> Self {
        self.symbols.insert(token, symbol.to_string());
        self
    }

    pub fn with_decimals(mut self, token: Address, decimals: u32) -> Self {
        self.decimals.insert(token, decimals);
        self
    }

    pub fn with_base_uri(mut self, collection: Address, uri: &str) -> Self {
        self.base_uris.insert(collection, uri.to_string());
        self
    }

    pub fn with_vault_address(mut self, collection: Address, token_id: u64, vault: Address) -> Self {
        self.vault_addresses
            .insert((collection, U256::from(token_id)), vault);
        self
    }
}

#[async_trait]
impl TokenReader for StubReader {
    async fn try_name(&self, token: &Address) -> ReadResult<String> {
        self.names.get(token).cloned().ok_or(Reverted)
    }

    async fn try_symbol(&self, token: &Address) -> ReadResult<String> {
        self.symbols.get(token).cloned().ok_or(Reverted)
    }

    async fn try_decimals(&self, token: &Address) -> ReadResult<u32> {
        self.decimals.get(token).copied().ok_or(Reverted)
    }

    async fn try_base_uri(&self, collection: &Address) -> ReadResult<String> {
        self.base_uris.get(collection).cloned().ok_or(Reverted)
    }

    async fn try_compute_vault_address(
        &self,
        collection: &Address,
        token_id: &U256,
    ) -> ReadResult<Address> {
        self.vault_addresses
            .get(&(*collection, *token_id))
            .copied()
            .ok_or(Reverted)
    }
}

// =============================================================================
// Silent source
// =============================================================================

/// Event source that never yields; the harness feeds events directly
/// through [`ReconcilerService::process_event`].
pub struct NullSource;

#[async_trait]
impl EventSource for NullSource {
    async fn latest_block(&self) -> ChainResult<u64> {
        Ok(0)
    }

    async fn subscribe(&self) -> ChainResult<LedgerEventStream> {
        Ok(Box::pin(futures::stream::empty()))
    }
}

// =============================================================================
// Harness
// =============================================================================

/// In-memory store plus a fully wired reconciler service.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    service: ReconcilerService<NullSource>,
}

impl Harness {
    pub fn new(reader: StubReader) -> Self {
        let store = Arc::new(MemoryStore::new());
        let registry = build_registry(
            store.clone() as Arc<dyn EntityStore>,
            Arc::new(reader),
            NULL_ADDRESS,
        );
        let service = ReconcilerService::new(
            ReconcilerConfig::default(),
            Arc::new(NullSource),
            Arc::new(registry),
        );
        Self { store, service }
    }

    /// Route one event through the router (guards included).
    pub async fn process(&self, event: LedgerEvent) {
        self.service.process_event(&event).await;
    }
}

// =============================================================================
// Event constructors
// =============================================================================

pub fn fungible(token: Address, from: Address, to: Address, value: u64, idx: u32) -> LedgerEvent {
    LedgerEvent::Fungible(FungibleTransfer {
        token,
        from,
        to,
        value: U256::from(value),
        meta: meta(idx),
    })
}

pub fn nft(collection: Address, from: Address, to: Address, token_id: u64, idx: u32) -> LedgerEvent {
    LedgerEvent::NonFungible(NonFungibleTransfer {
        collection,
        from,
        to,
        token_id: U256::from(token_id),
        meta: meta(idx),
    })
}

pub fn sf_single(
    token: Address,
    from: Address,
    to: Address,
    id: u64,
    value: u64,
    idx: u32,
) -> LedgerEvent {
    LedgerEvent::SemiFungibleSingle(SemiFungibleTransferSingle {
        token,
        operator: from,
        from,
        to,
        id: U256::from(id),
        value: U256::from(value),
        meta: meta(idx),
    })
}

pub fn sf_batch(
    token: Address,
    from: Address,
    to: Address,
    ids: &[u64],
    values: &[u64],
    idx: u32,
) -> LedgerEvent {
    LedgerEvent::SemiFungibleBatch(SemiFungibleTransferBatch {
        token,
        operator: from,
        from,
        to,
        ids: ids.iter().copied().map(U256::from).collect(),
        values: values.iter().copied().map(U256::from).collect(),
        meta: meta(idx),
    })
}

pub fn collection_created(collection: Address, idx: u32) -> LedgerEvent {
    LedgerEvent::CollectionCreated(CollectionCreated {
        collection,
        meta: meta(idx),
    })
}
