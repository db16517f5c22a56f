//! Core primitives for the VeriChain document verification client.
//!
//! This crate provides the leaf building blocks used by every other crate in
//! the workspace: the content hash that identifies a document on-chain, the
//! hasher that computes it, and the file handle a document is read through.
//!
//! ## Key Components
//!
//! - **DocumentHash**: 256-bit content address of a document ([`DocumentHash`])
//! - **Content hashing**: SHA-256 behind a swappable trait ([`ContentHasher`], [`Sha256Hasher`])
//! - **Files**: named, typed document handles checked against an allow-list ([`DocumentFile`], [`MediaType`])
//!
//! ## Usage Examples
//!
//! ```
//! use verichain_primitives::{compute_content_hash, DocumentFile, DocumentHash};
//!
//! let hash = compute_content_hash(b"hello");
//! assert_eq!(
//!     hash.to_hex(),
//!     "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
//! );
//!
//! // Hand-entered hashes are validated before they reach the contract
//! let parsed: DocumentHash = hash.to_hex().parse().unwrap();
//! assert_eq!(parsed, hash);
//! assert!("abc".parse::<DocumentHash>().is_err());
//!
//! let file = DocumentFile::from_bytes("report.pdf", "application/pdf", b"%PDF-1.7".as_slice());
//! assert!(file.media_type().is_ok());
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

// Re-export dependencies that are part of our public API
pub use bytes;

pub mod error;
pub mod file;
pub mod hash;
pub mod hasher;

// Re-export core types
pub use error::{PrimitivesError, Result};
pub use file::{DocumentFile, MediaType};
pub use hash::{DocumentHash, HASH_HEX_LENGTH};
pub use hasher::{ContentHasher, DigestHasher, Sha256Hasher, compute_content_hash};
