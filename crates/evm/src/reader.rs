//! `eth_call`-backed implementation of the `TokenReader` port.
//!
//! Every outcome that is not a clean, decodable return value maps to
//! `Reverted`: an on-chain revert, malformed return data from a
//! non-compliant contract, or a transport fault. The port contract is
//! that a read can never abort the surrounding reconciliation; the
//! distinction is preserved in the adapter's log lines only.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use custodia_core::models::{Address, U256};
use custodia_core::ports::{ReadResult, Reverted, TokenReader};

use crate::abi;
use crate::client::{CallOutcome, RpcClient};

/// Token metadata reader over JSON-RPC.
pub struct EthTokenReader {
    client: Arc<RpcClient>,
    /// Controller contract that owns the counterfactual vault-address
    /// computation.
    controller: Address,
}

impl EthTokenReader {
    pub fn new(client: Arc<RpcClient>, controller: Address) -> Self {
        Self { client, controller }
    }

    /// Run one read call and decode its return data.
    async fn read<T>(
        &self,
        contract: &Address,
        calldata: Vec<u8>,
        attribute: &'static str,
        decode: fn(&[u8]) -> Option<T>,
    ) -> ReadResult<T> {
        match self.client.call(contract, &calldata).await {
            Ok(CallOutcome::Data(data)) => decode(&data).ok_or(Reverted),
            Ok(CallOutcome::Reverted) => Err(Reverted),
            Err(e) => {
                info!(
                    contract = %contract,
                    attribute,
                    error = ?e,
                    "Read transport fault, treated as reverted"
                );
                Err(Reverted)
            }
        }
    }
}

#[async_trait]
impl TokenReader for EthTokenReader {
    async fn try_name(&self, token: &Address) -> ReadResult<String> {
        self.read(token, abi::encode_call0(abi::SEL_NAME), "name", abi::decode_string)
            .await
    }

    async fn try_symbol(&self, token: &Address) -> ReadResult<String> {
        self.read(
            token,
            abi::encode_call0(abi::SEL_SYMBOL),
            "symbol",
            abi::decode_string,
        )
        .await
    }

    async fn try_decimals(&self, token: &Address) -> ReadResult<u32> {
        self.read(
            token,
            abi::encode_call0(abi::SEL_DECIMALS),
            "decimals",
            abi::decode_u32,
        )
        .await
    }

    async fn try_base_uri(&self, collection: &Address) -> ReadResult<String> {
        self.read(
            collection,
            abi::encode_call0(abi::SEL_BASE_URI),
            "base_uri",
            abi::decode_string,
        )
        .await
    }

    async fn try_compute_vault_address(
        &self,
        collection: &Address,
        token_id: &U256,
    ) -> ReadResult<Address> {
        let controller = self.controller;
        self.read(
            &controller,
            abi::encode_compute_address(collection, token_id),
            "compute_vault_address",
            abi::decode_address,
        )
        .await
    }
}
