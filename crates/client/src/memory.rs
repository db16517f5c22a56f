//! In-memory registry and wallet.
//!
//! [`MemoryChain`] models the registry contract's state and access rules
//! without a node: the owner manages exporters, exporters record and delete
//! document hashes, and every write goes through the same estimate-then-send
//! path as on a real chain. [`MemoryWallet`] stands in for the browser
//! wallet, including the account and network switches a user can make.
//!
//! Both are used by the test suites and are handy for local demos.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use alloy_primitives::{Address, B256};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use verichain_primitives::DocumentHash;

use crate::error::{CallError, CallFailure};
use crate::provider::{ProviderError, WalletEvent, WalletProvider};
use crate::registry::{
    ContractStats, DocumentRecord, DocumentRegistry, RegistryBinder, TxHash, WriteCall,
};

const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
const BLOCK_TIME: u64 = 12;
const BASE_GAS: u64 = 21_000;
const STORAGE_GAS: u64 = 20_000;

struct EstimateHook(Box<dyn FnOnce() + Send>);

impl fmt::Debug for EstimateHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EstimateHook")
    }
}

#[derive(Debug)]
struct ChainState {
    owner: Address,
    exporters: HashMap<Address, String>,
    documents: HashMap<DocumentHash, DocumentRecord>,
    block: u64,
    next_tx: u64,
    calls: u64,
    last_gas_limit: Option<u64>,
    fail_next_send: Option<String>,
    on_estimate: Option<EstimateHook>,
}

impl ChainState {
    fn timestamp(&self) -> u64 {
        GENESIS_TIMESTAMP + self.block * BLOCK_TIME
    }

    /// Checks a write against the contract rules without changing state.
    fn check(&self, from: Address, call: &WriteCall) -> Result<(), String> {
        let is_owner = from == self.owner;
        let is_exporter = self.exporters.contains_key(&from);
        match call {
            WriteCall::AddExporter { account, .. } => {
                if !is_owner {
                    return Err("caller is not the owner".into());
                }
                if self.exporters.contains_key(account) {
                    return Err("exporter already registered".into());
                }
            }
            WriteCall::AlterExporter { account, .. } | WriteCall::DeleteExporter { account } => {
                if !is_owner {
                    return Err("caller is not the owner".into());
                }
                if !self.exporters.contains_key(account) {
                    return Err("exporter not registered".into());
                }
            }
            WriteCall::ChangeOwner { new_owner } => {
                if !is_owner {
                    return Err("caller is not the owner".into());
                }
                if new_owner.is_zero() {
                    return Err("new owner is the zero address".into());
                }
            }
            WriteCall::AddDocHash { hash, .. } => {
                if !is_exporter {
                    return Err("caller is not an exporter".into());
                }
                if self.documents.contains_key(hash) {
                    return Err("document already recorded".into());
                }
            }
            WriteCall::DeleteHash { hash } => {
                if !is_owner && !is_exporter {
                    return Err("caller is not an exporter".into());
                }
                if !self.documents.contains_key(hash) {
                    return Err("document not found".into());
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, from: Address, call: &WriteCall) {
        self.block += 1;
        let timestamp = self.timestamp();
        match call.clone() {
            WriteCall::AddExporter { account, info } | WriteCall::AlterExporter { account, info } => {
                self.exporters.insert(account, info);
            }
            WriteCall::DeleteExporter { account } => {
                self.exporters.remove(&account);
            }
            WriteCall::ChangeOwner { new_owner } => self.owner = new_owner,
            WriteCall::AddDocHash { hash, ipfs } => {
                let exporter_info = self.exporters.get(&from).cloned().unwrap_or_default();
                self.documents.insert(
                    hash,
                    DocumentRecord {
                        block_number: self.block,
                        timestamp,
                        exporter_info,
                        ipfs_pointer: ipfs,
                    },
                );
            }
            WriteCall::DeleteHash { hash } => {
                self.documents.remove(&hash);
            }
        }
    }

    fn next_tx_hash(&mut self) -> TxHash {
        self.next_tx += 1;
        let mut bytes = [0u8; 32];
        bytes[24..32].copy_from_slice(&self.next_tx.to_be_bytes());
        B256::from(bytes)
    }
}

fn gas_cost(call: &WriteCall) -> u64 {
    let calldata = call.abi_encode().len() as u64;
    BASE_GAS + STORAGE_GAS + 16 * calldata
}

/// Shared state of an in-memory registry contract.
///
/// Clones share state, so a test can keep a handle for inspection while the
/// client under test writes through a bound [`MemoryRegistry`].
#[derive(Debug, Clone)]
pub struct MemoryChain {
    state: Arc<Mutex<ChainState>>,
}

impl MemoryChain {
    /// Creates a contract owned by `owner`, with no exporters or documents.
    pub fn new(owner: Address) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState {
                owner,
                exporters: HashMap::new(),
                documents: HashMap::new(),
                block: 1,
                next_tx: 0,
                calls: 0,
                last_gas_limit: None,
                fail_next_send: None,
                on_estimate: None,
            })),
        }
    }

    /// Registers an exporter directly, without a transaction.
    pub fn with_exporter(self, account: Address, info: impl Into<String>) -> Self {
        self.state.lock().exporters.insert(account, info.into());
        self
    }

    /// Records a document directly, as if `exporter` had submitted it.
    pub fn with_document(self, hash: DocumentHash, exporter: Address, ipfs: impl Into<String>) -> Self {
        {
            let mut state = self.state.lock();
            let call = WriteCall::AddDocHash {
                hash,
                ipfs: ipfs.into(),
            };
            state.apply(exporter, &call);
        }
        self
    }

    /// Returns a registry bound to `contract` and `account`.
    pub fn registry(&self, contract: Address, account: Address) -> MemoryRegistry {
        MemoryRegistry {
            chain: self.clone(),
            contract,
            account,
        }
    }

    /// Returns the current owner.
    pub fn owner(&self) -> Address {
        self.state.lock().owner
    }

    /// Returns the current block number.
    pub fn block_number(&self) -> u64 {
        self.state.lock().block
    }

    /// Returns the stored record for `hash`, if any.
    pub fn document(&self, hash: &DocumentHash) -> Option<DocumentRecord> {
        self.state.lock().documents.get(hash).cloned()
    }

    /// Returns the info of a registered exporter.
    pub fn exporter(&self, account: &Address) -> Option<String> {
        self.state.lock().exporters.get(account).cloned()
    }

    /// Returns how many contract calls (reads, estimates and sends) were made.
    pub fn call_count(&self) -> u64 {
        self.state.lock().calls
    }

    /// Returns the gas limit of the most recent send.
    pub fn last_gas_limit(&self) -> Option<u64> {
        self.state.lock().last_gas_limit
    }

    /// Makes the next send fail with an RPC error, as a dropped connection would.
    pub fn fail_next_send(&self, reason: impl Into<String>) {
        self.state.lock().fail_next_send = Some(reason.into());
    }

    /// Runs `hook` once, right after the next successful gas estimate.
    ///
    /// Lets a test act as the user while a write is between its estimate
    /// and its send, for example by switching the wallet's account.
    pub fn on_next_estimate(&self, hook: impl FnOnce() + Send + 'static) {
        self.state.lock().on_estimate = Some(EstimateHook(Box::new(hook)));
    }

    fn read<T>(&self, f: impl FnOnce(&ChainState) -> T) -> T {
        let mut state = self.state.lock();
        state.calls += 1;
        f(&state)
    }
}

impl<P> RegistryBinder<P> for MemoryChain {
    type Registry = MemoryRegistry;

    fn bind(&self, _provider: &Arc<P>, contract: Address, account: Address) -> MemoryRegistry {
        self.registry(contract, account)
    }
}

/// A [`MemoryChain`] bound to a contract address and a sending account.
#[derive(Debug, Clone)]
pub struct MemoryRegistry {
    chain: MemoryChain,
    contract: Address,
    account: Address,
}

impl DocumentRegistry for MemoryRegistry {
    fn address(&self) -> Address {
        self.contract
    }

    fn account(&self) -> Address {
        self.account
    }

    async fn owner(&self) -> Result<Address, CallError> {
        Ok(self.chain.read(|s| s.owner))
    }

    async fn is_exporter(&self, account: Address) -> Result<bool, CallError> {
        Ok(self.chain.read(|s| s.exporters.contains_key(&account)))
    }

    async fn exporter_info(&self, account: Address) -> Result<String, CallError> {
        Ok(self
            .chain
            .read(|s| s.exporters.get(&account).cloned().unwrap_or_default()))
    }

    async fn document_exists(&self, hash: DocumentHash) -> Result<bool, CallError> {
        Ok(self.chain.read(|s| s.documents.contains_key(&hash)))
    }

    async fn find_doc_hash(&self, hash: DocumentHash) -> Result<DocumentRecord, CallError> {
        Ok(self.chain.read(|s| {
            s.documents.get(&hash).cloned().unwrap_or(DocumentRecord {
                block_number: 0,
                timestamp: 0,
                exporter_info: String::new(),
                ipfs_pointer: String::new(),
            })
        }))
    }

    async fn stats(&self) -> Result<ContractStats, CallError> {
        Ok(self.chain.read(|s| ContractStats {
            exporters: s.exporters.len() as u64,
            documents: s.documents.len() as u64,
        }))
    }

    async fn count_exporters(&self) -> Result<u64, CallError> {
        Ok(self.chain.read(|s| s.exporters.len() as u64))
    }

    async fn count_hashes(&self) -> Result<u64, CallError> {
        Ok(self.chain.read(|s| s.documents.len() as u64))
    }

    async fn estimate_gas(&self, call: &WriteCall) -> Result<u64, CallError> {
        self.chain
            .read(|s| s.check(self.account, call))
            .map_err(|reason| {
                CallError::new(CallFailure::Estimate, format!("execution reverted: {reason}"))
            })?;

        let hook = self.chain.state.lock().on_estimate.take();
        if let Some(EstimateHook(hook)) = hook {
            hook();
        }
        Ok(gas_cost(call))
    }

    async fn send(&self, call: &WriteCall, gas_limit: u64) -> Result<TxHash, CallError> {
        let mut state = self.chain.state.lock();
        state.calls += 1;

        if let Some(reason) = state.fail_next_send.take() {
            return Err(CallError::new(CallFailure::Rpc, reason));
        }
        state.last_gas_limit = Some(gas_limit);

        let tx_hash = state.next_tx_hash();
        if gas_limit < gas_cost(call) {
            state.block += 1;
            return Err(CallError::new(
                CallFailure::Reverted,
                format!("transaction {tx_hash} ran out of gas"),
            ));
        }
        if let Err(reason) = state.check(self.account, call) {
            state.block += 1;
            return Err(CallError::new(
                CallFailure::Reverted,
                format!("transaction {tx_hash} reverted: {reason}"),
            ));
        }
        state.apply(self.account, call);
        Ok(tx_hash)
    }
}

#[derive(Debug)]
struct WalletState {
    accounts: Vec<Address>,
    authorized: bool,
    rejects: bool,
    chain_id: u64,
}

/// An in-memory wallet holding a fixed list of accounts.
#[derive(Debug)]
pub struct MemoryWallet {
    state: Mutex<WalletState>,
    events: broadcast::Sender<WalletEvent>,
}

impl MemoryWallet {
    /// Creates a wallet that has not yet authorized this client.
    pub fn new(accounts: Vec<Address>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(WalletState {
                accounts,
                authorized: false,
                rejects: false,
                chain_id: 5777,
            }),
            events,
        }
    }

    /// Creates a wallet that already authorized this client in an earlier visit.
    pub fn authorized(accounts: Vec<Address>) -> Self {
        let wallet = Self::new(accounts);
        wallet.state.lock().authorized = true;
        wallet
    }

    /// Makes authorization requests fail as if the user clicked "reject".
    pub fn set_rejects(&self, rejects: bool) {
        self.state.lock().rejects = rejects;
    }

    /// Switches the active account and notifies subscribers.
    pub fn switch_account(&self, account: Address) {
        let accounts = {
            let mut state = self.state.lock();
            state.accounts.retain(|a| *a != account);
            state.accounts.insert(0, account);
            state.accounts.clone()
        };
        let _ = self.events.send(WalletEvent::AccountsChanged(accounts));
    }

    /// Switches to another network and notifies subscribers.
    pub fn switch_chain(&self, chain_id: u64) {
        self.state.lock().chain_id = chain_id;
        let _ = self.events.send(WalletEvent::ChainChanged(chain_id));
    }

    /// Revokes every account and notifies subscribers.
    pub fn lock(&self) {
        self.state.lock().accounts.clear();
        let _ = self.events.send(WalletEvent::AccountsChanged(Vec::new()));
    }
}

impl WalletProvider for MemoryWallet {
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let state = self.state.lock();
        Ok(if state.authorized {
            state.accounts.clone()
        } else {
            Vec::new()
        })
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let mut state = self.state.lock();
        if state.rejects {
            return Err(ProviderError::UserRejected);
        }
        state.authorized = true;
        Ok(state.accounts.clone())
    }

    async fn request(
        &self,
        method: &str,
        _params: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        match method {
            "eth_chainId" => Ok(serde_json::Value::String(format!(
                "{:#x}",
                self.state.lock().chain_id
            ))),
            "net_version" => Ok(serde_json::Value::String(
                self.state.lock().chain_id.to_string(),
            )),
            "eth_accounts" => Ok(serde_json::json!(self.accounts().await?)),
            _ => Err(ProviderError::from_code(
                -32601,
                format!("method {method} not supported"),
            )),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}
