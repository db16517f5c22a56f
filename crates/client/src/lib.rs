//! VeriChain document client.
//!
//! Stores SHA-256 fingerprints of documents in the VeriChain registry
//! contract and verifies documents against it, through the user's wallet.
//!
//! ## Key Components
//!
//! - **Orchestrator**: every user-facing workflow in one place ([`Orchestrator`])
//! - **Sessions**: wallet connection, role derivation, stale-session detection ([`SessionManager`])
//! - **Registry**: typed contract access over JSON-RPC or in memory ([`DocumentRegistry`], [`RpcRegistry`], [`MemoryChain`])
//! - **Descriptor loading**: fetch and parse the deployment artifact ([`load_descriptor`])
//!
//! ## Usage Examples
//!
//! ```
//! use std::sync::Arc;
//! use alloy_primitives::Address;
//! use verichain_client::{
//!     AutoConfirm, ClientConfig, MemoryChain, MemoryWallet, Orchestrator, Role, StaticSource,
//!     VerificationInput,
//! };
//! use verichain_primitives::{DocumentFile, Sha256Hasher};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let owner = Address::repeat_byte(1);
//! let chain = MemoryChain::new(owner).with_exporter(owner, "Registrar");
//! let wallet = Arc::new(MemoryWallet::new(vec![owner]));
//!
//! let mut client = Orchestrator::new(
//!     ClientConfig::default(),
//!     Some(wallet),
//!     chain,
//!     Sha256Hasher::new(),
//!     AutoConfirm,
//! );
//! let artifact = std::fs::read("../../fixtures/VeriChain.json").unwrap();
//! client.load_descriptor(&StaticSource::new(artifact)).await.unwrap();
//! assert_eq!(client.connect().await.unwrap(), Role::Owner);
//!
//! let file = DocumentFile::from_bytes("report.pdf", "application/pdf", b"%PDF-1.7".as_slice());
//! client.hash_and_stage(file.clone()).unwrap();
//! client.submit_document(None).await.unwrap();
//!
//! let outcome = client.verify(VerificationInput::File(file)).await.unwrap();
//! assert!(outcome.is_found());
//! # });
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod config;
pub mod error;
pub mod loader;
pub mod memory;
pub mod orchestrator;
pub mod provider;
pub mod registry;
pub mod rpc;
pub mod session;
pub mod workflow;

pub use config::{ClientConfig, DEFAULT_DOCUMENT_TAG, DEFAULT_MANUAL_TAG, MIN_GAS_BUFFER_PERCENT};
pub use error::{CallError, CallFailure, ClientError, Result};
#[cfg(feature = "http")]
pub use loader::HttpSource;
pub use loader::{
    AnySource, DescriptorSource, FileSource, StaticSource, load_configured, load_descriptor,
};
pub use memory::{MemoryChain, MemoryRegistry, MemoryWallet};
pub use orchestrator::{
    AlwaysDecline, AutoConfirm, ConfirmAction, Confirmer, Orchestrator, ReceiptInfo,
    VerificationInput, VerificationOutcome,
};
pub use provider::{ProviderError, USER_REJECTED, WalletEvent, WalletProvider};
pub use registry::{
    ContractStats, DocumentRecord, DocumentRegistry, RegistryBinder, TxHash, WriteCall,
};
pub use rpc::{RpcBinder, RpcRegistry};
pub use session::{Access, Role, Session, SessionManager};
pub use workflow::{PendingDocument, UploadState, UploadWorkflow};
