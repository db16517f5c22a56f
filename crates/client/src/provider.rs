//! Wallet provider abstraction.
//!
//! The client talks to the user's wallet through [`WalletProvider`], shaped
//! after the EIP-1193 provider a browser wallet injects: account discovery,
//! an authorization request, a generic JSON-RPC `request`, and a stream of
//! account and network change notifications.

use std::future::Future;

use alloy_primitives::Address;
use thiserror::Error;
use tokio::sync::broadcast;

/// EIP-1193 error code for a request the user rejected.
pub const USER_REJECTED: i64 = 4001;

/// Errors reported by a wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The user rejected the request in the wallet.
    #[error("user rejected the request")]
    UserRejected,

    /// The provider or node answered with a JSON-RPC error.
    #[error("provider error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
    },

    /// The provider could not be reached.
    #[error("provider transport failed: {0}")]
    Transport(String),
}

impl ProviderError {
    /// Builds an error from a JSON-RPC error code and message.
    pub fn from_code(code: i64, message: impl Into<String>) -> Self {
        if code == USER_REJECTED {
            Self::UserRejected
        } else {
            Self::Rpc {
                code,
                message: message.into(),
            }
        }
    }
}

/// A notification pushed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// The set of authorized accounts changed; the first is the active one.
    AccountsChanged(Vec<Address>),
    /// The wallet switched to another network.
    ChainChanged(u64),
}

/// Access to the user's wallet.
pub trait WalletProvider: Send + Sync {
    /// Returns the accounts already authorized for this client, without prompting.
    fn accounts(&self) -> impl Future<Output = Result<Vec<Address>, ProviderError>> + Send;

    /// Asks the user to authorize accounts, prompting if needed.
    fn request_accounts(&self)
    -> impl Future<Output = Result<Vec<Address>, ProviderError>> + Send;

    /// Sends a raw JSON-RPC request through the wallet.
    fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> impl Future<Output = Result<serde_json::Value, ProviderError>> + Send;

    /// Subscribes to account and network change notifications.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(
            ProviderError::from_code(USER_REJECTED, "User denied"),
            ProviderError::UserRejected
        );
        assert_eq!(
            ProviderError::from_code(-32603, "internal"),
            ProviderError::Rpc {
                code: -32603,
                message: "internal".into()
            }
        );
    }
}
