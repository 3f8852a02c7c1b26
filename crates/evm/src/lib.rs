//! EVM JSON-RPC adapter for the Custodia reconciler.
//!
//! This crate implements the [`EventSource`] and [`TokenReader`] ports
//! from `custodia-core` against an EVM node over HTTP JSON-RPC.
//!
//! # Features
//!
//! - Ordered event delivery by polling `eth_getLogs` in bounded block
//!   ranges from a configured start block
//! - Decoding of the five consumed event shapes by topic hash (ERC-20 vs
//!   ERC-721 `Transfer` disambiguated by indexed-topic count)
//! - `eth_call`-based metadata reads where an on-chain revert (or a
//!   transport fault) surfaces as the port's `Reverted` outcome, never
//!   as an error
//!
//! # Usage
//!
//! ```ignore
//! use custodia_evm::{EthEventSource, EthTokenReader, LogSourceConfig, RpcClient, RpcClientConfig};
//!
//! let client = Arc::new(RpcClient::new(RpcClientConfig {
//!     http_url: "http://localhost:8545".to_string(),
//! })?);
//!
//! let reader = EthTokenReader::new(client.clone());
//! let source = EthEventSource::new(client, LogSourceConfig {
//!     controller,
//!     start_block: 10_000_000,
//!     ..Default::default()
//! });
//! ```
//!
//! [`EventSource`]: custodia_core::ports::EventSource
//! [`TokenReader`]: custodia_core::ports::TokenReader

pub mod abi;

mod client;
mod reader;
mod source;

pub use client::{CallOutcome, RawLog, RpcClient, RpcClientConfig};
pub use reader::EthTokenReader;
pub use source::{EthEventSource, LogSourceConfig};
