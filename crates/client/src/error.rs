//! Error types for client workflows.
//!
//! Every workflow returns [`ClientError`]. Failures from the layers below
//! (primitives, descriptor parsing, the wallet provider, contract calls) are
//! folded into it so callers have a single type to report to the user.

use core::fmt;

use thiserror::Error;
use verichain_contracts::DescriptorError;
use verichain_networks::Network;
use verichain_primitives::PrimitivesError;

use crate::provider::ProviderError;
use crate::session::{Access, Role};

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Which step of a contract interaction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallFailure {
    /// Gas estimation for a write was refused (usually a revert during simulation).
    Estimate,
    /// The transaction was mined but reverted.
    Reverted,
    /// The provider or the node returned an error.
    Rpc,
    /// The response could not be decoded.
    Decode,
    /// No receipt arrived within the confirmation timeout.
    Timeout,
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Estimate => "gas estimation",
            Self::Reverted => "transaction",
            Self::Rpc => "contract call",
            Self::Decode => "response decoding",
            Self::Timeout => "transaction confirmation",
        })
    }
}

/// A failed contract interaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} failed: {message}")]
pub struct CallError {
    /// The failing step.
    pub kind: CallFailure,
    /// Message from the provider, node or decoder.
    pub message: String,
}

impl CallError {
    /// Creates a new call error.
    pub fn new(kind: CallFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Errors returned by client workflows.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The descriptor could not be fetched (transport, HTTP status or timeout).
    #[error("failed to fetch contract descriptor from {location}: {message}")]
    DescriptorFetch {
        /// Where the descriptor was fetched from.
        location: String,
        /// What went wrong.
        message: String,
    },

    /// The descriptor was fetched but is not usable.
    #[error("failed to parse contract descriptor: {0}")]
    DescriptorParse(String),

    /// The descriptor has no deployment for the target network.
    #[error("contract address not found for network {network}")]
    NetworkNotDeployed {
        /// The target network.
        network: Network,
    },

    /// No wallet provider is available.
    #[error("wallet provider not found; install a browser wallet such as MetaMask")]
    WalletUnavailable,

    /// The user rejected the authorization request.
    #[error("wallet authorization was denied")]
    AuthorizationDenied,

    /// The wallet authorized no accounts.
    #[error("wallet did not provide any account")]
    NoAccounts,

    /// The wallet is connected to a network the contract is not deployed on.
    #[error("wallet is on network {actual}, but the contract is deployed on {expected}")]
    WrongNetwork {
        /// Network the descriptor was resolved on.
        expected: Network,
        /// Network id the wallet reported.
        actual: u64,
    },

    /// Any other wallet provider failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A session was requested before a descriptor was loaded.
    #[error("contract descriptor is not loaded")]
    DescriptorMissing,

    /// The operation needs a wallet session and none was established.
    #[error("wallet is not connected")]
    NotConnected,

    /// The account or network changed since the session was established.
    #[error("wallet account or network changed; reconnect and try again")]
    StaleSession,

    /// The file's media type is not on the allow-list.
    #[error("unsupported file type `{media_type}` for `{name}`: select a PDF, DOC, DOCX or TXT file")]
    UnsupportedFileType {
        /// File name.
        name: String,
        /// Declared media type.
        media_type: String,
    },

    /// Hashing was requested with no file staged.
    #[error("no file selected")]
    NoFileSelected,

    /// Submission was requested before the document was hashed.
    #[error("document hash has not been generated")]
    NotHashed,

    /// A hand-entered hash is malformed.
    #[error("invalid hash format: {0}")]
    InvalidHashFormat(String),

    /// The connected account's role does not allow the operation.
    #[error("only {required} can {operation}; connected account is {role}")]
    Unauthorized {
        /// Operation that was refused.
        operation: &'static str,
        /// Access level the operation needs.
        required: Access,
        /// Role of the connected account.
        role: Role,
    },

    /// A required input was empty.
    #[error("{0} must not be empty")]
    MissingField(&'static str),

    /// The user declined a confirmation prompt.
    #[error("operation cancelled")]
    Cancelled,

    /// Reading a document failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A contract read or write failed.
    #[error(transparent)]
    ContractCall(#[from] CallError),
}

impl From<PrimitivesError> for ClientError {
    fn from(err: PrimitivesError) -> Self {
        match err {
            PrimitivesError::InvalidHashFormat(reason) => Self::InvalidHashFormat(reason),
            PrimitivesError::UnsupportedFileType { name, media_type } => {
                Self::UnsupportedFileType { name, media_type }
            }
            PrimitivesError::Io(e) => Self::Io(e),
        }
    }
}

impl From<DescriptorError> for ClientError {
    fn from(err: DescriptorError) -> Self {
        match err {
            DescriptorError::NetworkNotDeployed { network } => Self::NetworkNotDeployed { network },
            other => Self::DescriptorParse(other.to_string()),
        }
    }
}
