//! Upload workflow state.
//!
//! A document moves through `NoFile -> FileStaged -> Hashed -> Submitted`
//! and back to `NoFile`. Selecting a new file at any point replaces the
//! pending one; a failed submission leaves the document hashed so it can be
//! resubmitted.

use tracing::debug;
use verichain_primitives::{DocumentFile, DocumentHash, MediaType};

use crate::error::{ClientError, Result};

/// Where the upload workflow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// Nothing selected.
    NoFile,
    /// A file is selected but not yet hashed.
    FileStaged,
    /// The file's hash is computed and ready to submit.
    Hashed,
    /// The hash was recorded on-chain.
    Submitted,
}

/// A document selected for upload.
#[derive(Debug, Clone)]
pub struct PendingDocument {
    file: DocumentFile,
    media_type: MediaType,
    hash: Option<DocumentHash>,
    epoch: Option<u64>,
}

impl PendingDocument {
    /// Returns the selected file.
    pub const fn file(&self) -> &DocumentFile {
        &self.file
    }

    /// Returns the accepted media type.
    pub const fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Returns the computed hash, once hashed.
    pub const fn hash(&self) -> Option<DocumentHash> {
        self.hash
    }

    /// Returns the session epoch the hash was computed under.
    pub const fn epoch(&self) -> Option<u64> {
        self.epoch
    }
}

/// Tracks the document currently being uploaded.
#[derive(Debug, Default)]
pub struct UploadWorkflow {
    pending: Option<PendingDocument>,
    submitted: Option<DocumentHash>,
}

impl UploadWorkflow {
    /// Creates an empty workflow.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    pub fn state(&self) -> UploadState {
        match (&self.pending, &self.submitted) {
            (_, Some(_)) => UploadState::Submitted,
            (None, None) => UploadState::NoFile,
            (Some(PendingDocument { hash: None, .. }), None) => UploadState::FileStaged,
            (Some(PendingDocument { hash: Some(_), .. }), None) => UploadState::Hashed,
        }
    }

    /// Returns the pending document, if any.
    pub const fn pending(&self) -> Option<&PendingDocument> {
        self.pending.as_ref()
    }

    /// Stages a file, replacing anything pending.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnsupportedFileType`] if the file is not on the
    /// allow-list; the workflow is then left empty.
    pub fn stage(&mut self, file: DocumentFile) -> Result<&PendingDocument> {
        self.reset();
        let media_type = file.media_type()?;
        debug!(file = file.name(), media_type = media_type.as_str(), "file staged");
        Ok(&*self.pending.insert(PendingDocument {
            file,
            media_type,
            hash: None,
            epoch: None,
        }))
    }

    /// Records the hash of the staged file, computed under session `epoch`.
    pub fn record_hash(&mut self, hash: DocumentHash, epoch: u64) -> Result<&PendingDocument> {
        let pending = self.pending.as_mut().ok_or(ClientError::NoFileSelected)?;
        pending.hash = Some(hash);
        pending.epoch = Some(epoch);
        debug!(hash = %hash.short(10), epoch, "document hashed");
        Ok(&*pending)
    }

    /// Marks the pending document as recorded on-chain.
    pub fn mark_submitted(&mut self) -> Option<DocumentHash> {
        let hash = self.pending.as_ref()?.hash?;
        self.pending = None;
        self.submitted = Some(hash);
        Some(hash)
    }

    /// Returns to `NoFile`.
    pub fn reset(&mut self) {
        self.pending = None;
        self.submitted = None;
    }
}
