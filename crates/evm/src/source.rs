//! `eth_getLogs`-backed implementation of the `EventSource` port.
//!
//! The source polls the node in bounded block ranges from a configured
//! start block and decodes the five consumed event shapes by topic hash.
//! Delivery order is the canonical ledger order: logs are sorted by
//! (block number, log index) before being yielded, and progress is kept
//! across resubscriptions so no range is delivered twice.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_stream::stream;
use tracing::{debug, trace, warn};

use custodia_core::error::ChainResult;
use custodia_core::models::{
    Address, CollectionCreated, EventMeta, FungibleTransfer, LedgerEvent, NonFungibleTransfer,
    SemiFungibleTransferBatch, SemiFungibleTransferSingle, U256,
};
use custodia_core::ports::{EventSource, LedgerEventStream};

use crate::abi;
use crate::client::{RawLog, RpcClient};

// Event signature hashes (keccak-256 of the canonical signature).
/// `Transfer(address,address,uint256)` - shared by ERC-20 and ERC-721,
/// disambiguated by indexed-topic count.
const TRANSFER_TOPIC: &str = "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
/// `TransferSingle(address,address,address,uint256,uint256)`
const TRANSFER_SINGLE_TOPIC: &str =
    "c3d58168c5ae7397731d063d5bbf3d657854427343f4c083240f7aacaa2d0f62";
/// `TransferBatch(address,address,address,uint256[],uint256[])`
const TRANSFER_BATCH_TOPIC: &str =
    "4a39dc06d4c0dbc64b70af90fd698a233a518aa5d07e595d983b8c0526c8f7fb";
/// `ControlledCollectionCreated(address)`
const COLLECTION_CREATED_TOPIC: &str =
    "174fa923a32cd0cc9f644426ab04824eda24bbb63c54cbb97d55c1eb29283af4";

/// Configuration for the log source.
#[derive(Debug, Clone)]
pub struct LogSourceConfig {
    /// Controller contract emitting `ControlledCollectionCreated`.
    /// Creation events from any other contract are ignored.
    pub controller: Address,
    /// First block to deliver events from.
    pub start_block: u64,
    /// Polling interval once the head is reached.
    pub poll_interval: Duration,
    /// Maximum blocks per `eth_getLogs` range.
    pub chunk_size: u64,
}

impl Default for LogSourceConfig {
    fn default() -> Self {
        Self {
            controller: Address::ZERO,
            start_block: 0,
            poll_interval: Duration::from_secs(12),
            chunk_size: 1000,
        }
    }
}

/// Ledger event source over JSON-RPC log polling.
pub struct EthEventSource {
    client: Arc<RpcClient>,
    config: LogSourceConfig,
    /// Next block to fetch; survives resubscription so a delivery fault
    /// never re-delivers an already-yielded range.
    next_block: Arc<AtomicU64>,
}

impl EthEventSource {
    pub fn new(client: Arc<RpcClient>, config: LogSourceConfig) -> Self {
        let next_block = Arc::new(AtomicU64::new(config.start_block));
        Self {
            client,
            config,
            next_block,
        }
    }

    fn topic_filter() -> Vec<[u8; 32]> {
        [
            TRANSFER_TOPIC,
            TRANSFER_SINGLE_TOPIC,
            TRANSFER_BATCH_TOPIC,
            COLLECTION_CREATED_TOPIC,
        ]
        .iter()
        .map(|t| {
            let mut topic = [0u8; 32];
            // Compile-time constants; decode cannot fail.
            hex::decode_to_slice(t, &mut topic).expect("valid topic constant");
            topic
        })
        .collect()
    }
}

#[async_trait::async_trait]
impl EventSource for EthEventSource {
    async fn latest_block(&self) -> ChainResult<u64> {
        self.client.block_number().await
    }

    async fn subscribe(&self) -> ChainResult<LedgerEventStream> {
        let client = self.client.clone();
        let config = self.config.clone();
        let next_block = self.next_block.clone();
        let topics = Self::topic_filter();

        let stream = stream! {
            loop {
                let from = next_block.load(Ordering::Acquire);
                let head = match client.block_number().await {
                    Ok(head) => head,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                if from > head {
                    trace!(head, "Head reached, waiting for new blocks");
                    tokio::time::sleep(config.poll_interval).await;
                    continue;
                }

                let to = head.min(from + config.chunk_size.saturating_sub(1));
                let logs = match client.get_logs(from, to, &topics).await {
                    Ok(logs) => logs,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let mut events: Vec<LedgerEvent> = logs
                    .iter()
                    .filter_map(|log| decode_log(log, &config.controller))
                    .collect();
                // Defensive: nodes already order by (block, log index).
                events.sort_by_key(|e| (e.meta().block_number, e.meta().log_index));

                debug!(from, to, events = events.len(), "Range fetched");
                for event in events {
                    yield Ok(event);
                }

                next_block.store(to + 1, Ordering::Release);
            }
        };

        Ok(Box::pin(stream))
    }
}

// =============================================================================
// Log decoding
// =============================================================================

/// Decode one raw log into a ledger event.
///
/// Returns `None` for shapes the reconciler does not consume and for
/// malformed payloads (logged); a bad log never fails the range.
fn decode_log(log: &RawLog, controller: &Address) -> Option<LedgerEvent> {
    let topic0 = log.topics.first()?;
    let signature = hex::encode(topic0);
    let meta = EventMeta {
        block_number: log.block_number,
        tx_hash: log.tx_hash,
        log_index: log.log_index,
    };

    match signature.as_str() {
        TRANSFER_TOPIC => decode_transfer(log, meta),
        TRANSFER_SINGLE_TOPIC => decode_transfer_single(log, meta),
        TRANSFER_BATCH_TOPIC => decode_transfer_batch(log, meta),
        COLLECTION_CREATED_TOPIC => {
            if log.address != *controller {
                trace!(address = %log.address, "Collection creation from foreign contract ignored");
                return None;
            }
            decode_collection_created(log, meta)
        }
        _ => None,
    }
}

/// `Transfer` is one signature with two layouts: ERC-20 indexes two
/// topics and carries the value in data; ERC-721 indexes three.
fn decode_transfer(log: &RawLog, meta: EventMeta) -> Option<LedgerEvent> {
    match log.topics.len() {
        3 => {
            let value = abi::decode_u256(&log.data).or_else(|| {
                warn!(token = %log.address, event = %meta.id(), "Malformed fungible Transfer data");
                None
            })?;
            Some(LedgerEvent::Fungible(FungibleTransfer {
                token: log.address,
                from: abi::topic_to_address(&log.topics[1]),
                to: abi::topic_to_address(&log.topics[2]),
                value,
                meta,
            }))
        }
        4 => Some(LedgerEvent::NonFungible(NonFungibleTransfer {
            collection: log.address,
            from: abi::topic_to_address(&log.topics[1]),
            to: abi::topic_to_address(&log.topics[2]),
            token_id: U256::from_big_endian(&log.topics[3]),
            meta,
        })),
        n => {
            warn!(
                token = %log.address,
                topics = n,
                event = %meta.id(),
                "Transfer with unexpected topic count, skipped"
            );
            None
        }
    }
}

fn decode_transfer_single(log: &RawLog, meta: EventMeta) -> Option<LedgerEvent> {
    if log.topics.len() != 4 {
        warn!(token = %log.address, event = %meta.id(), "Malformed TransferSingle topics");
        return None;
    }
    let id = abi::decode_u256(&log.data)?;
    let value = abi::decode_u256(log.data.get(abi::WORD..)?)?;
    Some(LedgerEvent::SemiFungibleSingle(SemiFungibleTransferSingle {
        token: log.address,
        operator: abi::topic_to_address(&log.topics[1]),
        from: abi::topic_to_address(&log.topics[2]),
        to: abi::topic_to_address(&log.topics[3]),
        id,
        value,
        meta,
    }))
}

fn decode_transfer_batch(log: &RawLog, meta: EventMeta) -> Option<LedgerEvent> {
    if log.topics.len() != 4 {
        warn!(token = %log.address, event = %meta.id(), "Malformed TransferBatch topics");
        return None;
    }
    let ids = abi::decode_u256_array(&log.data, 0).or_else(|| {
        warn!(token = %log.address, event = %meta.id(), "Malformed TransferBatch ids");
        None
    })?;
    let values = abi::decode_u256_array(&log.data, 1).or_else(|| {
        warn!(token = %log.address, event = %meta.id(), "Malformed TransferBatch values");
        None
    })?;
    Some(LedgerEvent::SemiFungibleBatch(SemiFungibleTransferBatch {
        token: log.address,
        operator: abi::topic_to_address(&log.topics[1]),
        from: abi::topic_to_address(&log.topics[2]),
        to: abi::topic_to_address(&log.topics[3]),
        ids,
        values,
        meta,
    }))
}

fn decode_collection_created(log: &RawLog, meta: EventMeta) -> Option<LedgerEvent> {
    // Tolerate both an indexed and an unindexed token parameter.
    let collection = if log.topics.len() >= 2 {
        abi::topic_to_address(&log.topics[1])
    } else {
        abi::decode_address(&log.data).or_else(|| {
            warn!(event = %meta.id(), "Malformed ControlledCollectionCreated data");
            None
        })?
    };
    Some(LedgerEvent::CollectionCreated(CollectionCreated {
        collection,
        meta,
    }))
}

// =============================================================================
// Tests
// =============================================================================
