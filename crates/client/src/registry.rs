//! Typed access to the document registry contract.
//!
//! [`DocumentRegistry`] has one method per contract read plus a two-step
//! write path: [`DocumentRegistry::estimate_gas`] then
//! [`DocumentRegistry::send`]. A registry is bound to one contract address
//! and one sending account; a [`RegistryBinder`] produces a fresh one for
//! every wallet session.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use alloy_primitives::{Address, B256};
use alloy_sol_types::SolCall;
use verichain_contracts::IVeriChain;
use verichain_primitives::DocumentHash;

use crate::error::CallError;

/// Transaction hash.
pub type TxHash = B256;

/// A document record as stored on-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    /// Block the document was recorded in. Zero when no record exists.
    pub block_number: u64,
    /// Block timestamp, in seconds since the Unix epoch.
    pub timestamp: u64,
    /// Info string of the exporter that recorded the document.
    pub exporter_info: String,
    /// Free-form off-chain pointer (IPFS hash or a tag).
    pub ipfs_pointer: String,
}

impl DocumentRecord {
    /// Returns true if this is a real record rather than the contract's
    /// zero-valued default for an unknown hash.
    pub const fn is_present(&self) -> bool {
        self.block_number != 0
    }
}

/// Aggregate contract counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContractStats {
    /// Number of registered exporters.
    pub exporters: u64,
    /// Number of recorded documents.
    pub documents: u64,
}

/// A state-changing contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCall {
    /// Register an exporter.
    AddExporter {
        /// Exporter account.
        account: Address,
        /// Human-readable institution info.
        info: String,
    },
    /// Change an exporter's info.
    AlterExporter {
        /// Exporter account.
        account: Address,
        /// New info.
        info: String,
    },
    /// Remove an exporter.
    DeleteExporter {
        /// Exporter account.
        account: Address,
    },
    /// Hand the contract to a new owner.
    ChangeOwner {
        /// The new owner.
        new_owner: Address,
    },
    /// Record a document hash.
    AddDocHash {
        /// Document hash.
        hash: DocumentHash,
        /// Off-chain pointer or tag.
        ipfs: String,
    },
    /// Remove a document record.
    DeleteHash {
        /// Document hash.
        hash: DocumentHash,
    },
}

impl WriteCall {
    /// Returns the contract function signature.
    pub const fn signature(&self) -> &'static str {
        match self {
            Self::AddExporter { .. } => IVeriChain::add_ExporterCall::SIGNATURE,
            Self::AlterExporter { .. } => IVeriChain::alter_ExporterCall::SIGNATURE,
            Self::DeleteExporter { .. } => IVeriChain::delete_ExporterCall::SIGNATURE,
            Self::ChangeOwner { .. } => IVeriChain::changeOwnerCall::SIGNATURE,
            Self::AddDocHash { .. } => IVeriChain::addDocHashCall::SIGNATURE,
            Self::DeleteHash { .. } => IVeriChain::deleteHashCall::SIGNATURE,
        }
    }

    /// ABI-encodes the call, selector included.
    pub fn abi_encode(&self) -> Vec<u8> {
        match self.clone() {
            Self::AddExporter { account, info } => {
                IVeriChain::add_ExporterCall { account, info }.abi_encode()
            }
            Self::AlterExporter { account, info } => {
                IVeriChain::alter_ExporterCall { account, info }.abi_encode()
            }
            Self::DeleteExporter { account } => {
                IVeriChain::delete_ExporterCall { account }.abi_encode()
            }
            Self::ChangeOwner { new_owner } => IVeriChain::changeOwnerCall {
                newOwner: new_owner,
            }
            .abi_encode(),
            Self::AddDocHash { hash, ipfs } => IVeriChain::addDocHashCall {
                hash: hash.into(),
                ipfs,
            }
            .abi_encode(),
            Self::DeleteHash { hash } => IVeriChain::deleteHashCall { hash: hash.into() }.abi_encode(),
        }
    }
}

/// The document registry contract, bound to a sending account.
pub trait DocumentRegistry: Clone + fmt::Debug + Send + Sync {
    /// Returns the contract address.
    fn address(&self) -> Address;

    /// Returns the account calls are sent from.
    fn account(&self) -> Address;

    /// Reads the contract owner.
    fn owner(&self) -> impl Future<Output = Result<Address, CallError>> + Send;

    /// Returns true if `account` is a registered exporter.
    fn is_exporter(&self, account: Address)
    -> impl Future<Output = Result<bool, CallError>> + Send;

    /// Reads an exporter's info string. Empty for unknown accounts.
    fn exporter_info(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<String, CallError>> + Send;

    /// Returns true if a record exists for `hash`.
    fn document_exists(
        &self,
        hash: DocumentHash,
    ) -> impl Future<Output = Result<bool, CallError>> + Send;

    /// Reads the record for `hash`; zero-valued when none exists.
    fn find_doc_hash(
        &self,
        hash: DocumentHash,
    ) -> impl Future<Output = Result<DocumentRecord, CallError>> + Send;

    /// Reads both counters in one call.
    fn stats(&self) -> impl Future<Output = Result<ContractStats, CallError>> + Send;

    /// Reads the exporter count.
    fn count_exporters(&self) -> impl Future<Output = Result<u64, CallError>> + Send;

    /// Reads the document count.
    fn count_hashes(&self) -> impl Future<Output = Result<u64, CallError>> + Send;

    /// Estimates the gas a write needs.
    fn estimate_gas(
        &self,
        call: &WriteCall,
    ) -> impl Future<Output = Result<u64, CallError>> + Send;

    /// Sends a write with an explicit gas limit and waits until it is confirmed.
    fn send(
        &self,
        call: &WriteCall,
        gas_limit: u64,
    ) -> impl Future<Output = Result<TxHash, CallError>> + Send;
}

/// Produces a registry for a newly established wallet session.
pub trait RegistryBinder<P>: Send + Sync {
    /// The registry type produced.
    type Registry: DocumentRegistry;

    /// Binds the contract at `contract` to `account`, sending through `provider`.
    fn bind(&self, provider: &Arc<P>, contract: Address, account: Address) -> Self::Registry;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_record() {
        let record = DocumentRecord {
            block_number: 0,
            timestamp: 0,
            exporter_info: String::new(),
            ipfs_pointer: String::new(),
        };
        assert!(!record.is_present());
        assert!(DocumentRecord { block_number: 1, ..record }.is_present());
    }

    #[test]
    fn test_write_call_encoding() {
        let hash = DocumentHash::new([0xab; 32]);
        let call = WriteCall::AddDocHash {
            hash,
            ipfs: "Document hash only".into(),
        };
        let encoded = call.abi_encode();
        assert_eq!(&encoded[..4], IVeriChain::addDocHashCall::SELECTOR.as_slice());
        assert_eq!(&encoded[4..36], hash.as_bytes());

        let decoded = IVeriChain::addDocHashCall::abi_decode(&encoded).unwrap();
        assert_eq!(decoded.ipfs, "Document hash only");
        assert_eq!(call.signature(), "addDocHash(bytes32,string)");
    }

    #[test]
    fn test_change_owner_encoding() {
        let new_owner = Address::repeat_byte(0x42);
        let encoded = WriteCall::ChangeOwner { new_owner }.abi_encode();
        let decoded = IVeriChain::changeOwnerCall::abi_decode(&encoded).unwrap();
        assert_eq!(decoded.newOwner, new_owner);
    }
}
