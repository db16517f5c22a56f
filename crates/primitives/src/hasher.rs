//! Content hashing.
//!
//! The client never hashes documents directly; it goes through
//! [`ContentHasher`] so tests can substitute a deterministic double. The
//! production implementation is [`Sha256Hasher`].

use std::fmt;
use std::io::Read;
use std::marker::PhantomData;

use alloy_primitives::B256;
use digest::{Digest, OutputSizeUser, consts::U32};

use crate::{DocumentFile, DocumentHash, Result};

/// Bytes read per step when hashing a file.
const READ_CHUNK: usize = 64 * 1024;

/// Computes content addresses for documents.
pub trait ContentHasher {
    /// Hashes a byte buffer.
    fn digest(&self, data: &[u8]) -> DocumentHash;

    /// Reads a file in full and hashes its contents.
    ///
    /// # Errors
    ///
    /// Returns `PrimitivesError::Io` if the contents cannot be read.
    fn hash_file(&self, file: &DocumentFile) -> Result<DocumentHash> {
        let data = file.read()?;
        Ok(self.digest(&data))
    }
}

/// A [`ContentHasher`] backed by any 256-bit [`Digest`].
pub struct DigestHasher<D> {
    _digest: PhantomData<fn() -> D>,
}

/// SHA-256 content hasher.
pub type Sha256Hasher = DigestHasher<sha2::Sha256>;

impl<D> DigestHasher<D> {
    /// Creates a new hasher.
    pub const fn new() -> Self {
        Self {
            _digest: PhantomData,
        }
    }
}

impl<D> Default for DigestHasher<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for DigestHasher<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for DigestHasher<D> {}

impl<D> fmt::Debug for DigestHasher<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestHasher")
            .field("digest", &std::any::type_name::<D>())
            .finish()
    }
}

impl<D> ContentHasher for DigestHasher<D>
where
    D: Digest + OutputSizeUser<OutputSize = U32>,
{
    #[inline]
    fn digest(&self, data: &[u8]) -> DocumentHash {
        let output = <D as Digest>::digest(data);
        DocumentHash(B256::from_slice(output.as_slice()))
    }

    /// Streams the file through the digest without holding it in memory.
    fn hash_file(&self, file: &DocumentFile) -> Result<DocumentHash> {
        let mut reader = file.reader()?;
        let mut state = D::new();
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            Digest::update(&mut state, &buf[..n]);
        }
        Ok(DocumentHash(B256::from_slice(Digest::finalize(state).as_slice())))
    }
}

/// Computes the SHA-256 content hash of a buffer.
///
/// ```
/// use verichain_primitives::compute_content_hash;
///
/// let a = compute_content_hash(b"report");
/// let b = compute_content_hash(b"report");
/// assert_eq!(a, b);
/// assert_eq!(a.to_hex().len(), 64);
/// ```
pub fn compute_content_hash(data: &[u8]) -> DocumentHash {
    Sha256Hasher::new().digest(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// SHA-256 of the empty byte slice (well-known constant).
    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_known_vectors() {
        assert_eq!(compute_content_hash(b"").to_hex(), EMPTY_SHA256);
        assert_eq!(
            compute_content_hash(b"hello").to_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_hash_file_matches_buffer() {
        let data = b"%PDF-1.7 quarterly report".to_vec();
        let file = DocumentFile::from_bytes("report.pdf", "application/pdf", data.clone());

        let hasher = Sha256Hasher::default();
        assert_eq!(hasher.hash_file(&file).unwrap(), hasher.digest(&data));
    }

    #[test]
    fn test_hash_file_streams_large_files() {
        let data: Vec<u8> = (0..READ_CHUNK * 3 + 17).map(|i| (i % 251) as u8).collect();
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        std::io::Write::write_all(&mut tmp, &data).unwrap();

        let file = DocumentFile::from_path(tmp.path());
        assert_eq!(Sha256Hasher::new().hash_file(&file).unwrap(), compute_content_hash(&data));
    }

    #[test]
    fn test_hash_file_io_failure() {
        let file = DocumentFile::from_path("/nonexistent/verichain/report.pdf");
        assert!(matches!(
            Sha256Hasher::new().hash_file(&file),
            Err(crate::PrimitivesError::Io(_))
        ));
    }

    proptest! {
        #[test]
        fn test_hash_deterministic(data in proptest::collection::vec(any::<u8>(), 1..4096)) {
            let first = compute_content_hash(&data);
            let second = compute_content_hash(&data);
            prop_assert_eq!(first, second);

            let rendered = first.to_hex();
            prop_assert_eq!(rendered.len(), 64);
            prop_assert!(rendered.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }
}
