//! Error types for descriptor parsing.

use thiserror::Error;
use verichain_networks::Network;

/// Errors that can occur when parsing a contract descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The document is not valid JSON or does not have the descriptor shape.
    #[error("malformed contract descriptor: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The ABI does not declare a function the client calls.
    #[error("contract ABI does not declare `{0}`")]
    MissingFunction(&'static str),

    /// The descriptor has no deployment for the requested network.
    #[error("contract is not deployed on network {network}")]
    NetworkNotDeployed {
        /// The requested network.
        network: Network,
    },
}
