//! Contract descriptor parsing.
//!
//! A descriptor is the build artifact produced when the contract is compiled
//! and migrated: the contract name, its JSON ABI, the compiler metadata as a
//! JSON-encoded string, and the address it was deployed to on each network.

use std::collections::BTreeMap;

use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, B256};
use alloy_sol_types::SolCall;
use serde::Deserialize;
use verichain_networks::Network;

use crate::{DescriptorError, IVeriChain};

/// Signatures of every function the typed client calls.
///
/// A descriptor whose ABI lacks one of these cannot be used, since a call
/// would only fail once it reached the chain.
pub const REQUIRED_FUNCTIONS: [&str; 14] = [
    IVeriChain::ownerCall::SIGNATURE,
    IVeriChain::isExporterCall::SIGNATURE,
    IVeriChain::getExporterInfoCall::SIGNATURE,
    IVeriChain::add_ExporterCall::SIGNATURE,
    IVeriChain::alter_ExporterCall::SIGNATURE,
    IVeriChain::delete_ExporterCall::SIGNATURE,
    IVeriChain::changeOwnerCall::SIGNATURE,
    IVeriChain::addDocHashCall::SIGNATURE,
    IVeriChain::deleteHashCall::SIGNATURE,
    IVeriChain::documentExistsCall::SIGNATURE,
    IVeriChain::findDocHashCall::SIGNATURE,
    IVeriChain::getStatsCall::SIGNATURE,
    IVeriChain::count_ExportersCall::SIGNATURE,
    IVeriChain::count_hashesCall::SIGNATURE,
];

/// Where the contract lives on one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// Contract address.
    pub address: Address,
    /// Hash of the deployment transaction, when the artifact records it.
    #[serde(default)]
    pub transaction_hash: Option<B256>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    #[serde(default)]
    contract_name: Option<String>,
    abi: JsonAbi,
    #[serde(default)]
    metadata: Option<String>,
    #[serde(default)]
    networks: BTreeMap<String, Deployment>,
}

/// A parsed descriptor, resolved against one target network.
///
/// Construction fails unless the target network has a deployment, so every
/// value of this type carries a usable contract address.
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    contract_name: String,
    abi: JsonAbi,
    metadata: Option<String>,
    deployments: BTreeMap<String, Deployment>,
    network: Network,
    deployment: Deployment,
}

impl ContractDescriptor {
    /// Name used when the artifact omits `contractName`.
    pub const DEFAULT_NAME: &'static str = "VeriChain";

    /// Parses a descriptor document and resolves it against `network`.
    ///
    /// # Errors
    ///
    /// - [`DescriptorError::Malformed`] if the document is not a descriptor
    /// - [`DescriptorError::MissingFunction`] if the ABI lacks a called function
    /// - [`DescriptorError::NetworkNotDeployed`] if `network` has no entry
    pub fn from_json(bytes: &[u8], network: Network) -> Result<Self, DescriptorError> {
        let raw: RawDescriptor = serde_json::from_slice(bytes)?;

        for signature in REQUIRED_FUNCTIONS {
            if !declares(&raw.abi, signature) {
                return Err(DescriptorError::MissingFunction(signature));
            }
        }

        let deployment = *raw
            .networks
            .get(&network.deployment_key())
            .ok_or(DescriptorError::NetworkNotDeployed { network })?;

        Ok(Self {
            contract_name: raw
                .contract_name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| Self::DEFAULT_NAME.to_owned()),
            abi: raw.abi,
            metadata: raw.metadata,
            deployments: raw.networks,
            network,
            deployment,
        })
    }

    /// Returns the contract name.
    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    /// Returns the contract's JSON ABI.
    pub const fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    /// Returns the network this descriptor was resolved against.
    pub const fn network(&self) -> Network {
        self.network
    }

    /// Returns the deployment on the resolved network.
    pub const fn deployment(&self) -> Deployment {
        self.deployment
    }

    /// Returns the contract address on the resolved network.
    pub const fn address(&self) -> Address {
        self.deployment.address
    }

    /// Returns every deployment the artifact lists, keyed by network id.
    pub const fn deployments(&self) -> &BTreeMap<String, Deployment> {
        &self.deployments
    }

    /// Returns the compiler version recorded in the metadata, if readable.
    pub fn compiler_version(&self) -> Option<String> {
        let metadata: serde_json::Value = serde_json::from_str(self.metadata.as_deref()?).ok()?;
        metadata
            .get("compiler")?
            .get("version")?
            .as_str()
            .map(str::to_owned)
    }
}

fn declares(abi: &JsonAbi, signature: &str) -> bool {
    let name = signature.split('(').next().unwrap_or(signature);
    abi.function(name)
        .is_some_and(|overloads| overloads.iter().any(|f| f.signature() == signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use proptest::prelude::*;
    use verichain_networks::{NamedNetwork, TARGET_NETWORK};

    const FIXTURE: &str = include_str!("../../../fixtures/VeriChain.json");

    fn fixture_value() -> serde_json::Value {
        serde_json::from_str(FIXTURE).unwrap()
    }

    #[test]
    fn test_parse_fixture() {
        let descriptor = ContractDescriptor::from_json(FIXTURE.as_bytes(), TARGET_NETWORK).unwrap();

        assert_eq!(descriptor.contract_name(), "VeriChain");
        assert_eq!(
            descriptor.address(),
            address!("5FbDB2315678afecb367f032d93F642f64180aa3")
        );
        assert_eq!(descriptor.network(), TARGET_NETWORK);
        assert_eq!(
            descriptor.compiler_version().as_deref(),
            Some("0.8.19+commit.7dd6d404")
        );
        assert!(descriptor.deployment().transaction_hash.is_some());
        assert_eq!(descriptor.deployments().len(), 1);
    }

    #[test]
    fn test_network_not_deployed() {
        let err = ContractDescriptor::from_json(FIXTURE.as_bytes(), NamedNetwork::Sepolia.into())
            .unwrap_err();
        assert!(matches!(
            err,
            DescriptorError::NetworkNotDeployed { network } if network.id() == 11155111
        ));
    }

    #[test]
    fn test_missing_networks_section() {
        let mut value = fixture_value();
        value.as_object_mut().unwrap().remove("networks");
        let bytes = serde_json::to_vec(&value).unwrap();

        assert!(matches!(
            ContractDescriptor::from_json(&bytes, TARGET_NETWORK),
            Err(DescriptorError::NetworkNotDeployed { .. })
        ));
    }

    #[test]
    fn test_malformed_documents() {
        let docs: [&[u8]; 4] = [b"not json", b"{}", b"[]", br#"{"abi": 5}"#];
        for doc in docs {
            assert!(matches!(
                ContractDescriptor::from_json(doc, TARGET_NETWORK),
                Err(DescriptorError::Malformed(_))
            ));
        }
    }

    #[test]
    fn test_bad_address_is_malformed() {
        let mut value = fixture_value();
        value["networks"]["5777"]["address"] = "0x1234".into();
        let bytes = serde_json::to_vec(&value).unwrap();

        assert!(matches!(
            ContractDescriptor::from_json(&bytes, TARGET_NETWORK),
            Err(DescriptorError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_function() {
        let mut value = fixture_value();
        value["abi"]
            .as_array_mut()
            .unwrap()
            .retain(|item| item["name"] != "findDocHash");
        let bytes = serde_json::to_vec(&value).unwrap();

        assert!(matches!(
            ContractDescriptor::from_json(&bytes, TARGET_NETWORK),
            Err(DescriptorError::MissingFunction("findDocHash(bytes32)"))
        ));
    }

    #[test]
    fn test_unreadable_metadata() {
        let mut value = fixture_value();
        value["metadata"] = "{not json".into();
        value.as_object_mut().unwrap().remove("contractName");
        let bytes = serde_json::to_vec(&value).unwrap();

        let descriptor = ContractDescriptor::from_json(&bytes, TARGET_NETWORK).unwrap();
        assert_eq!(descriptor.compiler_version(), None);
        assert_eq!(descriptor.contract_name(), ContractDescriptor::DEFAULT_NAME);
    }

    #[test]
    fn test_required_functions_are_unique() {
        let mut sigs = REQUIRED_FUNCTIONS.to_vec();
        sigs.sort_unstable();
        sigs.dedup();
        assert_eq!(sigs.len(), REQUIRED_FUNCTIONS.len());
    }

    proptest! {
        #[test]
        fn test_resolves_any_deployed_address(bytes in any::<[u8; 20]>()) {
            let deployed = Address::from(bytes);
            let mut value = fixture_value();
            value["networks"]["5777"]["address"] = deployed.to_string().into();
            let bytes = serde_json::to_vec(&value).unwrap();

            let descriptor = ContractDescriptor::from_json(&bytes, TARGET_NETWORK).unwrap();
            prop_assert_eq!(descriptor.address(), deployed);
        }
    }
}
