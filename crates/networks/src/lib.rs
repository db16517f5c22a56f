//! Network identifiers for VeriChain deployments.
//!
//! Contract descriptors key their deployments by network id (`"5777"` for a
//! local Ganache chain). This crate provides the well-known ids as
//! [`NamedNetwork`] and a [`Network`] type that also carries arbitrary ids.
//!
//! # Features
//!
//! - `serde`: Enable serde serialization/deserialization

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod named;
mod network;

pub use named::NamedNetwork;
pub use network::{Network, ParseNetworkError, TARGET_NETWORK};
