//! VeriChain contract bindings and deployment descriptors.
//!
//! This crate provides type-safe Solidity bindings for the document registry
//! contract using Alloy's `sol!` macro, along with the parser for the
//! descriptor file (ABI plus per-network deployment addresses) that the
//! client loads at startup.
//!
//! # Contract Bindings
//!
//! The `sol!` macro generates one call type per contract method, so a call
//! with the wrong arguments fails to compile instead of failing at runtime:
//!
//! ```
//! use alloy_primitives::B256;
//! use alloy_sol_types::SolCall;
//! use verichain_contracts::IVeriChain;
//!
//! let call = IVeriChain::documentExistsCall { hash: B256::repeat_byte(0xaa) };
//! let encoded = call.abi_encode();
//! assert_eq!(&encoded[..4], IVeriChain::documentExistsCall::SELECTOR.as_slice());
//! ```
//!
//! # Descriptors
//!
//! ```ignore
//! use verichain_contracts::ContractDescriptor;
//! use verichain_networks::TARGET_NETWORK;
//!
//! let descriptor = ContractDescriptor::from_json(&bytes, TARGET_NETWORK)?;
//! println!("{} at {}", descriptor.contract_name(), descriptor.address());
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod descriptor;
mod error;

pub use descriptor::{ContractDescriptor, Deployment, REQUIRED_FUNCTIONS};
pub use error::DescriptorError;

use alloy_sol_types::sol;

// Document Registry Interface

sol! {
    /// Document registry contract interface.
    ///
    /// The owner manages a list of exporters (institutions allowed to record
    /// documents); exporters record SHA-256 document hashes with an optional
    /// IPFS pointer; anyone may look a hash up.
    #[derive(Debug, PartialEq, Eq)]
    interface IVeriChain {
        function owner() external view returns (address);
        function isExporter(address account) external view returns (bool);
        function getExporterInfo(address account) external view returns (string memory);
        function add_Exporter(address account, string calldata info) external;
        function alter_Exporter(address account, string calldata info) external;
        function delete_Exporter(address account) external;
        function changeOwner(address newOwner) external;
        function addDocHash(bytes32 hash, string calldata ipfs) external;
        function deleteHash(bytes32 hash) external;
        function documentExists(bytes32 hash) external view returns (bool);
        function findDocHash(bytes32 hash) external view returns (
            uint256 blockNumber,
            uint256 timestamp,
            string memory exporterInfo,
            string memory ipfsHash
        );
        function getStats() external view returns (uint256 exporterCount, uint256 documentCount);
        function count_Exporters() external view returns (uint256);
        function count_hashes() external view returns (uint256);
    }
}
