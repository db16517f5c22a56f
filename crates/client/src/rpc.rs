//! [`DocumentRegistry`] over a wallet provider's JSON-RPC channel.
//!
//! Reads go out as `eth_call`, writes as `eth_estimateGas` followed by
//! `eth_sendTransaction`. After a write is sent the receipt is polled until
//! it arrives or the confirmation timeout runs out; a receipt with status
//! zero is reported as a revert.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, U64, U256};
use alloy_sol_types::SolCall;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use verichain_contracts::IVeriChain;
use verichain_primitives::DocumentHash;

use crate::error::{CallError, CallFailure};
use crate::provider::{ProviderError, WalletProvider};
use crate::registry::{
    ContractStats, DocumentRecord, DocumentRegistry, RegistryBinder, TxHash, WriteCall,
};

/// A registry that sends every call through a [`WalletProvider`].
pub struct RpcRegistry<P> {
    provider: Arc<P>,
    contract: Address,
    account: Address,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl<P> RpcRegistry<P> {
    /// Creates a registry for `contract`, sending from `account`.
    pub const fn new(
        provider: Arc<P>,
        contract: Address,
        account: Address,
        confirmation_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            provider,
            contract,
            account,
            confirmation_timeout,
            poll_interval,
        }
    }
}

impl<P> Clone for RpcRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            contract: self.contract,
            account: self.account,
            confirmation_timeout: self.confirmation_timeout,
            poll_interval: self.poll_interval,
        }
    }
}

impl<P> fmt::Debug for RpcRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcRegistry")
            .field("contract", &self.contract)
            .field("account", &self.account)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .finish_non_exhaustive()
    }
}

fn provider_error(kind: CallFailure, err: ProviderError) -> CallError {
    CallError::new(kind, err.to_string())
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, CallError> {
    serde_json::from_value(value)
        .map_err(|e| CallError::new(CallFailure::Decode, format!("{what}: {e}")))
}

fn to_u64(value: U256, field: &str) -> Result<u64, CallError> {
    u64::try_from(value)
        .map_err(|_| CallError::new(CallFailure::Decode, format!("{field} out of range: {value}")))
}

impl<P: WalletProvider> RpcRegistry<P> {
    fn tx_object(&self, data: Vec<u8>) -> Value {
        json!({
            "from": self.account,
            "to": self.contract,
            "data": Bytes::from(data),
        })
    }

    async fn call<C: SolCall + Send>(&self, call: C) -> Result<C::Return, CallError> {
        let params = json!([self.tx_object(call.abi_encode()), "latest"]);
        let raw = self
            .provider
            .request("eth_call", params)
            .await
            .map_err(|e| provider_error(CallFailure::Rpc, e))?;
        let output: Bytes = decode(raw, C::SIGNATURE)?;
        C::abi_decode_returns(&output)
            .map_err(|e| CallError::new(CallFailure::Decode, format!("{}: {e}", C::SIGNATURE)))
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<(), CallError> {
        let poll = async {
            loop {
                let raw = self
                    .provider
                    .request("eth_getTransactionReceipt", json!([tx_hash]))
                    .await
                    .map_err(|e| provider_error(CallFailure::Rpc, e))?;
                if !raw.is_null() {
                    return Ok(raw);
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        let receipt = tokio::time::timeout(self.confirmation_timeout, poll)
            .await
            .map_err(|_| {
                CallError::new(
                    CallFailure::Timeout,
                    format!(
                        "no receipt for {tx_hash} after {:?}",
                        self.confirmation_timeout
                    ),
                )
            })??;

        let status: U64 = decode(
            receipt.get("status").cloned().unwrap_or(Value::Null),
            "receipt status",
        )?;
        if status.is_zero() {
            warn!(%tx_hash, "transaction reverted");
            return Err(CallError::new(
                CallFailure::Reverted,
                format!("transaction {tx_hash} reverted"),
            ));
        }
        Ok(())
    }
}

impl<P: WalletProvider> DocumentRegistry for RpcRegistry<P> {
    fn address(&self) -> Address {
        self.contract
    }

    fn account(&self) -> Address {
        self.account
    }

    async fn owner(&self) -> Result<Address, CallError> {
        self.call(IVeriChain::ownerCall {}).await
    }

    async fn is_exporter(&self, account: Address) -> Result<bool, CallError> {
        self.call(IVeriChain::isExporterCall { account }).await
    }

    async fn exporter_info(&self, account: Address) -> Result<String, CallError> {
        self.call(IVeriChain::getExporterInfoCall { account }).await
    }

    async fn document_exists(&self, hash: DocumentHash) -> Result<bool, CallError> {
        self.call(IVeriChain::documentExistsCall { hash: hash.into() })
            .await
    }

    async fn find_doc_hash(&self, hash: DocumentHash) -> Result<DocumentRecord, CallError> {
        let found = self
            .call(IVeriChain::findDocHashCall { hash: hash.into() })
            .await?;
        Ok(DocumentRecord {
            block_number: to_u64(found.blockNumber, "blockNumber")?,
            timestamp: to_u64(found.timestamp, "timestamp")?,
            exporter_info: found.exporterInfo,
            ipfs_pointer: found.ipfsHash,
        })
    }

    async fn stats(&self) -> Result<ContractStats, CallError> {
        let stats = self.call(IVeriChain::getStatsCall {}).await?;
        Ok(ContractStats {
            exporters: to_u64(stats.exporterCount, "exporterCount")?,
            documents: to_u64(stats.documentCount, "documentCount")?,
        })
    }

    async fn count_exporters(&self) -> Result<u64, CallError> {
        let count = self.call(IVeriChain::count_ExportersCall {}).await?;
        to_u64(count, "count_Exporters")
    }

    async fn count_hashes(&self) -> Result<u64, CallError> {
        let count = self.call(IVeriChain::count_hashesCall {}).await?;
        to_u64(count, "count_hashes")
    }

    async fn estimate_gas(&self, call: &WriteCall) -> Result<u64, CallError> {
        let params = json!([self.tx_object(call.abi_encode())]);
        let raw = self
            .provider
            .request("eth_estimateGas", params)
            .await
            .map_err(|e| provider_error(CallFailure::Estimate, e))?;
        let gas: U64 = decode(raw, "eth_estimateGas")?;
        debug!(call = call.signature(), gas = gas.to::<u64>(), "estimated gas");
        Ok(gas.to::<u64>())
    }

    async fn send(&self, call: &WriteCall, gas_limit: u64) -> Result<TxHash, CallError> {
        let mut tx = self.tx_object(call.abi_encode());
        tx["gas"] = json!(U64::from(gas_limit));

        let raw = self
            .provider
            .request("eth_sendTransaction", json!([tx]))
            .await
            .map_err(|e| provider_error(CallFailure::Rpc, e))?;
        let tx_hash: TxHash = decode(raw, "eth_sendTransaction")?;
        debug!(call = call.signature(), %tx_hash, gas_limit, "transaction sent");

        self.wait_for_receipt(tx_hash).await?;
        Ok(tx_hash)
    }
}

/// Binds [`RpcRegistry`] instances for new sessions.
#[derive(Debug, Clone, Copy)]
pub struct RpcBinder {
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl RpcBinder {
    /// Creates a binder with the given receipt timing.
    pub const fn new(confirmation_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            confirmation_timeout,
            poll_interval,
        }
    }
}

impl<P: WalletProvider> RegistryBinder<P> for RpcBinder {
    type Registry = RpcRegistry<P>;

    fn bind(&self, provider: &Arc<P>, contract: Address, account: Address) -> RpcRegistry<P> {
        RpcRegistry::new(
            Arc::clone(provider),
            contract,
            account,
            self.confirmation_timeout,
            self.poll_interval,
        )
    }
}
