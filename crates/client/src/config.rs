//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use verichain_networks::{Network, TARGET_NETWORK};

/// Smallest gas buffer applied on top of an estimate, in percent.
pub const MIN_GAS_BUFFER_PERCENT: u64 = 20;

/// Tag recorded when a document is submitted without one.
pub const DEFAULT_DOCUMENT_TAG: &str = "Document hash only";

/// Tag recorded when a hash is entered by hand without one.
pub const DEFAULT_MANUAL_TAG: &str = "Manual hash entry";

/// Client settings.
///
/// Every field has a default, so a partial JSON document (or none at all)
/// yields a usable configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Where the contract descriptor is fetched from: an `http(s)://` URL or a file path.
    pub descriptor_location: String,
    /// Network the contract deployment is resolved on.
    pub network: Network,
    /// Descriptor fetch timeout, in milliseconds.
    pub fetch_timeout_ms: u64,
    /// How long to wait for a transaction receipt, in milliseconds.
    pub confirmation_timeout_ms: u64,
    /// Delay between receipt polls, in milliseconds.
    pub receipt_poll_interval_ms: u64,
    /// Percentage added on top of gas estimates. Values below 20 are raised to 20.
    pub gas_buffer_percent: u64,
    /// Tag used when a submission has none.
    pub default_document_tag: String,
    /// Tag used when a manual entry has none.
    pub default_manual_tag: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            descriptor_location: "./VeriChain.json".to_owned(),
            network: TARGET_NETWORK,
            fetch_timeout_ms: 10_000,
            confirmation_timeout_ms: 60_000,
            receipt_poll_interval_ms: 1_000,
            gas_buffer_percent: MIN_GAS_BUFFER_PERCENT,
            default_document_tag: DEFAULT_DOCUMENT_TAG.to_owned(),
            default_manual_tag: DEFAULT_MANUAL_TAG.to_owned(),
        }
    }
}

impl ClientConfig {
    /// Parses a configuration from JSON, filling in defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns the descriptor fetch timeout.
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Returns the transaction confirmation timeout.
    pub const fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    /// Returns the receipt poll interval.
    pub const fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    /// Returns the effective gas buffer, never below [`MIN_GAS_BUFFER_PERCENT`].
    pub const fn gas_buffer_percent(&self) -> u64 {
        if self.gas_buffer_percent < MIN_GAS_BUFFER_PERCENT {
            MIN_GAS_BUFFER_PERCENT
        } else {
            self.gas_buffer_percent
        }
    }

    /// Applies the gas buffer to an estimate, rounding down.
    pub fn gas_limit(&self, estimate: u64) -> u64 {
        let factor = u128::from(self.gas_buffer_percent().saturating_add(100));
        let limit = u128::from(estimate) * factor / 100;
        u64::try_from(limit).unwrap_or(u64::MAX)
    }
}
