//! Storage, verification and administration workflows.
//!
//! [`Orchestrator`] is the single entry point a front end drives. It owns the
//! loaded descriptor, the wallet session, the upload workflow and a cached
//! copy of the contract counters, and checks every precondition (input
//! format, session, role, confirmation) before a contract call is made.
//!
//! Writes are estimated first, then sent with the configured gas buffer on
//! top of the estimate. The wallet's change notifications are applied again
//! between the estimate and the send, so a write never goes out under an
//! account other than the one it was prepared for.

use std::fmt;
use std::sync::Arc;

use alloy_primitives::Address;
use tracing::{debug, info, instrument, warn};
use verichain_contracts::ContractDescriptor;
use verichain_primitives::{ContentHasher, DocumentFile, DocumentHash, Sha256Hasher};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::loader::{self, DescriptorSource};
use crate::provider::WalletProvider;
use crate::registry::{
    ContractStats, DocumentRecord, DocumentRegistry, RegistryBinder, TxHash, WriteCall,
};
use crate::rpc::RpcBinder;
use crate::session::{Access, Role, SessionManager};
use crate::workflow::{PendingDocument, UploadState, UploadWorkflow};

/// A destructive action awaiting the user's confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    /// Remove an exporter.
    RemoveExporter(Address),
    /// Hand the contract to a new owner.
    TransferOwnership(Address),
    /// Delete a document record.
    DeleteRecord(DocumentHash),
}

impl fmt::Display for ConfirmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoveExporter(account) => write!(f, "Remove exporter {account}?"),
            Self::TransferOwnership(account) => write!(
                f,
                "Transfer contract ownership to {account}? You will lose owner access."
            ),
            Self::DeleteRecord(hash) => {
                write!(f, "Delete the record for {hash}? This cannot be undone.")
            }
        }
    }
}

/// Asks the user to confirm destructive actions.
pub trait Confirmer: Send + Sync {
    /// Returns true if the user accepted `action`.
    fn confirm(&self, action: &ConfirmAction) -> bool;
}

impl<F> Confirmer for F
where
    F: Fn(&ConfirmAction) -> bool + Send + Sync,
{
    fn confirm(&self, action: &ConfirmAction) -> bool {
        self(action)
    }
}

/// Accepts every action.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Confirmer for AutoConfirm {
    fn confirm(&self, _action: &ConfirmAction) -> bool {
        true
    }
}

/// Declines every action.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDecline;

impl Confirmer for AlwaysDecline {
    fn confirm(&self, _action: &ConfirmAction) -> bool {
        false
    }
}

/// What to verify.
#[derive(Debug, Clone)]
pub enum VerificationInput {
    /// A file, hashed locally.
    File(DocumentFile),
    /// A hex hash entered by hand.
    Hash(String),
}

/// Result of a verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The document is on record.
    Found {
        /// Hash that was looked up.
        hash: DocumentHash,
        /// The stored record.
        record: DocumentRecord,
    },
    /// The document is not on record.
    NotFound {
        /// Hash that was looked up.
        hash: DocumentHash,
    },
}

impl VerificationOutcome {
    /// Returns the hash that was looked up.
    pub const fn hash(&self) -> DocumentHash {
        match self {
            Self::Found { hash, .. } | Self::NotFound { hash } => *hash,
        }
    }

    /// Returns true if the document is on record.
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// A confirmed document submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptInfo {
    /// Transaction that recorded the document.
    pub tx_hash: TxHash,
    /// The recorded hash.
    pub document_hash: DocumentHash,
    /// Contract the document was recorded in.
    pub contract: Address,
    /// Name of the submitted file.
    pub file_name: String,
    /// Tag stored alongside the hash.
    pub tag: String,
}

/// Drives every client workflow against one contract.
pub struct Orchestrator<P, B, H = Sha256Hasher, C = AutoConfirm>
where
    B: RegistryBinder<P>,
{
    config: ClientConfig,
    descriptor: Option<ContractDescriptor>,
    sessions: SessionManager<P, B>,
    hasher: H,
    confirmer: C,
    upload: UploadWorkflow,
    stats: Option<ContractStats>,
}

impl<P, B: RegistryBinder<P>, H, C> fmt::Debug for Orchestrator<P, B, H, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("descriptor", &self.descriptor.as_ref().map(|d| d.address()))
            .field("sessions", &self.sessions)
            .field("upload", &self.upload)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<P: WalletProvider, C: Confirmer> Orchestrator<P, RpcBinder, Sha256Hasher, C> {
    /// Creates an orchestrator that talks to the contract through the wallet's
    /// JSON-RPC channel and hashes with SHA-256.
    pub fn over_rpc(config: ClientConfig, provider: Option<Arc<P>>, confirmer: C) -> Self {
        let binder = RpcBinder::new(config.confirmation_timeout(), config.receipt_poll_interval());
        Self::new(config, provider, binder, Sha256Hasher::new(), confirmer)
    }
}

fn tag_or(tag: Option<&str>, default: &str) -> String {
    tag.map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(default)
        .to_owned()
}

fn parse_hash(input: &str) -> Result<DocumentHash> {
    Ok(DocumentHash::from_hex(input)?)
}

fn require_info(info: &str) -> Result<String> {
    let info = info.trim();
    if info.is_empty() {
        return Err(ClientError::MissingField("exporter info"));
    }
    Ok(info.to_owned())
}

fn require_account(account: Address, field: &'static str) -> Result<Address> {
    if account.is_zero() {
        return Err(ClientError::MissingField(field));
    }
    Ok(account)
}

impl<P, B, H, C> Orchestrator<P, B, H, C>
where
    P: WalletProvider,
    B: RegistryBinder<P>,
    H: ContentHasher,
    C: Confirmer,
{
    /// Creates an orchestrator. `provider` is `None` when no wallet is installed.
    pub fn new(
        config: ClientConfig,
        provider: Option<Arc<P>>,
        binder: B,
        hasher: H,
        confirmer: C,
    ) -> Self {
        Self {
            config,
            descriptor: None,
            sessions: SessionManager::new(provider, binder),
            hasher,
            confirmer,
            upload: UploadWorkflow::new(),
            stats: None,
        }
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the loaded descriptor.
    pub const fn descriptor(&self) -> Option<&ContractDescriptor> {
        self.descriptor.as_ref()
    }

    /// Fetches and installs the descriptor. On failure any previously loaded
    /// descriptor is kept, so a retry is always safe.
    pub async fn load_descriptor<S: DescriptorSource>(
        &mut self,
        source: &S,
    ) -> Result<&ContractDescriptor> {
        let descriptor =
            loader::load_descriptor(source, self.config.network, self.config.fetch_timeout())
                .await?;
        Ok(&*self.descriptor.insert(descriptor))
    }

    /// Installs an already parsed descriptor.
    pub fn set_descriptor(&mut self, descriptor: ContractDescriptor) {
        self.descriptor = Some(descriptor);
    }

    /// Asks the wallet for authorization and establishes a session.
    #[instrument(skip_all)]
    pub async fn connect(&mut self) -> Result<Role> {
        let role = self.sessions.connect(self.descriptor.as_ref()).await?.role();
        self.refresh_stats().await;
        Ok(role)
    }

    /// Restores a session the wallet already authorized, without prompting.
    pub async fn check_existing_session(&mut self) -> Result<Option<Role>> {
        let role = self
            .sessions
            .check_existing_session(self.descriptor.as_ref())
            .await?
            .map(|session| session.role());
        if role.is_some() {
            self.refresh_stats().await;
        }
        Ok(role)
    }

    /// Applies pending wallet notifications. Returns true if the session was lost.
    pub fn handle_wallet_events(&mut self) -> bool {
        let lost = self.sessions.poll_events();
        if lost {
            self.stats = None;
        }
        lost
    }

    /// Ends the session.
    pub fn disconnect(&mut self) {
        self.sessions.disconnect();
        self.stats = None;
    }

    /// Returns the connected account.
    pub fn account(&self) -> Option<Address> {
        self.sessions.peek().map(|s| s.account())
    }

    /// Returns the connected account's role.
    pub fn role(&self) -> Option<Role> {
        self.sessions.peek().map(|s| s.role())
    }

    /// Returns the counters as last read.
    pub const fn cached_stats(&self) -> Option<ContractStats> {
        self.stats
    }

    /// Returns the upload workflow state.
    pub fn upload_state(&self) -> UploadState {
        self.upload.state()
    }

    /// Returns the document being uploaded.
    pub const fn pending_document(&self) -> Option<&PendingDocument> {
        self.upload.pending()
    }

    fn active(&mut self) -> Result<(B::Registry, u64, Role)> {
        self.handle_wallet_events();
        let session = self.sessions.current()?;
        Ok((session.registry().clone(), session.epoch(), session.role()))
    }

    async fn refresh_stats(&mut self) {
        let Some(registry) = self.sessions.peek().map(|s| s.registry().clone()) else {
            return;
        };
        match registry.stats().await {
            Ok(stats) => self.stats = Some(stats),
            Err(e) => warn!(error = %e, "failed to refresh contract statistics"),
        }
    }

    async fn execute(&mut self, registry: &B::Registry, epoch: u64, call: &WriteCall) -> Result<TxHash> {
        let estimate = registry.estimate_gas(call).await?;

        // The user may have switched accounts while the estimate was pending.
        self.handle_wallet_events();
        self.sessions.ensure_epoch(epoch)?;

        let gas_limit = self.config.gas_limit(estimate);
        debug!(call = call.signature(), estimate, gas_limit, "sending transaction");
        Ok(registry.send(call, gas_limit).await?)
    }

    /// Stages a file for upload. Needs no session.
    pub fn select_file(&mut self, file: DocumentFile) -> Result<&PendingDocument> {
        self.upload.stage(file)
    }

    /// Hashes the staged file.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NoFileSelected`] if nothing is staged
    /// - [`ClientError::NotConnected`] or [`ClientError::StaleSession`] without a session
    /// - [`ClientError::Io`] if the file can no longer be read
    pub fn hash_staged(&mut self) -> Result<DocumentHash> {
        let file = self
            .upload
            .pending()
            .ok_or(ClientError::NoFileSelected)?
            .file()
            .clone();
        let (_, epoch, _) = self.active()?;

        let hash = self.hasher.hash_file(&file)?;
        self.upload.record_hash(hash, epoch)?;
        info!(file = file.name(), hash = %hash, "document hashed");
        Ok(hash)
    }

    /// Stages `file` and hashes it. Makes no contract call.
    #[instrument(skip_all, fields(file = file.name()))]
    pub fn hash_and_stage(&mut self, file: DocumentFile) -> Result<PendingDocument> {
        self.select_file(file)?;
        self.hash_staged()?;
        self.upload
            .pending()
            .cloned()
            .ok_or(ClientError::NoFileSelected)
    }

    /// Records the hashed document on-chain.
    ///
    /// `tag` is stored next to the hash; an empty tag falls back to the
    /// configured default. On failure the document stays hashed and can be
    /// resubmitted, except when the session went stale, which clears it.
    #[instrument(skip_all)]
    pub async fn submit_document(&mut self, tag: Option<&str>) -> Result<ReceiptInfo> {
        let pending = self.upload.pending().ok_or(ClientError::NotHashed)?;
        let hash = pending.hash().ok_or(ClientError::NotHashed)?;
        let hashed_under = pending.epoch();
        let file_name = pending.file().name().to_owned();

        let (registry, epoch, _) = match self.active() {
            Err(ClientError::StaleSession) => {
                self.upload.reset();
                return Err(ClientError::StaleSession);
            }
            other => other?,
        };
        if hashed_under != Some(epoch) {
            warn!(hash = %hash, "document was hashed under a previous session");
            self.upload.reset();
            return Err(ClientError::StaleSession);
        }

        let tag = tag_or(tag, &self.config.default_document_tag);
        let call = WriteCall::AddDocHash {
            hash,
            ipfs: tag.clone(),
        };
        let tx_hash = match self.execute(&registry, epoch, &call).await {
            Ok(tx_hash) => tx_hash,
            Err(ClientError::StaleSession) => {
                self.upload.reset();
                return Err(ClientError::StaleSession);
            }
            Err(e) => {
                warn!(error = %e, hash = %hash, "document submission failed");
                return Err(e);
            }
        };

        self.upload.mark_submitted();
        info!(%tx_hash, hash = %hash, file = %file_name, "document recorded");
        self.upload.reset();
        self.refresh_stats().await;

        Ok(ReceiptInfo {
            tx_hash,
            document_hash: hash,
            contract: registry.address(),
            file_name,
            tag,
        })
    }

    /// Looks a document up by file or by hash.
    ///
    /// The input is hashed or validated before any contract call, so a
    /// malformed hash fails with [`ClientError::InvalidHashFormat`] without
    /// touching the network.
    #[instrument(skip_all)]
    pub async fn verify(&mut self, input: VerificationInput) -> Result<VerificationOutcome> {
        let hash = match input {
            VerificationInput::File(file) => {
                file.media_type()?;
                self.hasher.hash_file(&file)?
            }
            VerificationInput::Hash(text) => parse_hash(&text)?,
        };
        let (registry, _, _) = self.active()?;

        if !registry.document_exists(hash).await? {
            info!(hash = %hash, "document not on record");
            return Ok(VerificationOutcome::NotFound { hash });
        }
        let record = registry.find_doc_hash(hash).await?;
        info!(hash = %hash, block = record.block_number, "document verified");
        Ok(VerificationOutcome::Found { hash, record })
    }

    async fn admin_write(
        &mut self,
        operation: &'static str,
        required: Access,
        confirm: Option<ConfirmAction>,
        call: WriteCall,
    ) -> Result<TxHash> {
        let (registry, epoch, role) = self.active()?;
        if !required.allows(role) {
            return Err(ClientError::Unauthorized {
                operation,
                required,
                role,
            });
        }
        if let Some(action) = confirm {
            if !self.confirmer.confirm(&action) {
                info!(%action, "cancelled by user");
                return Err(ClientError::Cancelled);
            }
        }

        let tx_hash = self.execute(&registry, epoch, &call).await?;
        info!(operation, %tx_hash, "transaction confirmed");
        self.refresh_stats().await;
        Ok(tx_hash)
    }

    /// Registers an exporter. Owner only.
    #[instrument(skip(self, info))]
    pub async fn add_exporter(&mut self, account: Address, info: &str) -> Result<TxHash> {
        let account = require_account(account, "exporter address")?;
        let info = require_info(info)?;
        self.admin_write(
            "add exporters",
            Access::Owner,
            None,
            WriteCall::AddExporter { account, info },
        )
        .await
    }

    /// Changes an exporter's info. Owner only.
    pub async fn alter_exporter(&mut self, account: Address, info: &str) -> Result<TxHash> {
        let account = require_account(account, "exporter address")?;
        let info = require_info(info)?;
        self.admin_write(
            "modify exporters",
            Access::Owner,
            None,
            WriteCall::AlterExporter { account, info },
        )
        .await
    }

    /// Removes an exporter after confirmation. Owner only.
    #[instrument(skip(self))]
    pub async fn remove_exporter(&mut self, account: Address) -> Result<TxHash> {
        let account = require_account(account, "exporter address")?;
        self.admin_write(
            "remove exporters",
            Access::Owner,
            Some(ConfirmAction::RemoveExporter(account)),
            WriteCall::DeleteExporter { account },
        )
        .await
    }

    /// Hands the contract to `new_owner` after confirmation, then re-derives
    /// the connected account's role. Owner only.
    #[instrument(skip(self))]
    pub async fn transfer_ownership(&mut self, new_owner: Address) -> Result<TxHash> {
        let new_owner = require_account(new_owner, "new owner address")?;
        let tx_hash = self
            .admin_write(
                "transfer ownership",
                Access::Owner,
                Some(ConfirmAction::TransferOwnership(new_owner)),
                WriteCall::ChangeOwner { new_owner },
            )
            .await?;

        if let Err(e) = self.sessions.refresh_role().await {
            warn!(error = %e, "could not re-derive role after ownership transfer");
            self.sessions.invalidate("role unknown after ownership transfer");
            self.stats = None;
        }
        Ok(tx_hash)
    }

    /// Records a hand-entered hash. Owner or exporter.
    pub async fn add_record_manually(&mut self, hash: &str, tag: Option<&str>) -> Result<TxHash> {
        let hash = parse_hash(hash)?;
        let ipfs = tag_or(tag, &self.config.default_manual_tag);
        self.admin_write(
            "add records",
            Access::OwnerOrExporter,
            None,
            WriteCall::AddDocHash { hash, ipfs },
        )
        .await
    }

    /// Deletes a record after confirmation. Owner or exporter.
    #[instrument(skip(self))]
    pub async fn delete_record(&mut self, hash: &str) -> Result<TxHash> {
        let hash = parse_hash(hash)?;
        self.admin_write(
            "delete records",
            Access::OwnerOrExporter,
            Some(ConfirmAction::DeleteRecord(hash)),
            WriteCall::DeleteHash { hash },
        )
        .await
    }

    /// Looks up a record by hash. Returns `None` when there is no record.
    pub async fn find_record(&mut self, hash: &str) -> Result<Option<DocumentRecord>> {
        let hash = parse_hash(hash)?;
        let (registry, _, _) = self.active()?;
        let record = registry.find_doc_hash(hash).await?;
        Ok(record.is_present().then_some(record))
    }

    /// Returns true if a record exists for `hash`.
    pub async fn document_exists(&mut self, hash: &str) -> Result<bool> {
        let hash = parse_hash(hash)?;
        let (registry, _, _) = self.active()?;
        Ok(registry.document_exists(hash).await?)
    }

    /// Returns true if `account` is a registered exporter.
    pub async fn is_exporter(&mut self, account: Address) -> Result<bool> {
        let (registry, _, _) = self.active()?;
        Ok(registry.is_exporter(account).await?)
    }

    /// Returns an exporter's info; empty for unknown accounts.
    pub async fn exporter_info(&mut self, account: Address) -> Result<String> {
        let (registry, _, _) = self.active()?;
        Ok(registry.exporter_info(account).await?)
    }

    /// Reads the contract counters and refreshes the cached copy.
    pub async fn get_stats(&mut self) -> Result<ContractStats> {
        let (registry, _, _) = self.active()?;
        let stats = registry.stats().await?;
        self.stats = Some(stats);
        Ok(stats)
    }

    /// Reads the contract owner.
    pub async fn get_owner(&mut self) -> Result<Address> {
        let (registry, _, _) = self.active()?;
        Ok(registry.owner().await?)
    }

    /// Reads the exporter count.
    pub async fn count_exporters(&mut self) -> Result<u64> {
        let (registry, _, _) = self.active()?;
        Ok(registry.count_exporters().await?)
    }

    /// Reads the document count.
    pub async fn count_documents(&mut self) -> Result<u64> {
        let (registry, _, _) = self.active()?;
        Ok(registry.count_hashes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_fallback() {
        assert_eq!(tag_or(None, "Document hash only"), "Document hash only");
        assert_eq!(tag_or(Some("  "), "Document hash only"), "Document hash only");
        assert_eq!(tag_or(Some(" QmDoc "), "Document hash only"), "QmDoc");
    }

    #[test]
    fn test_parse_hash() {
        for input in ["", " ", "abc", &format!("0x{}", "a".repeat(64))] {
            assert!(matches!(parse_hash(input), Err(ClientError::InvalidHashFormat(_))));
        }
        assert!(parse_hash(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_confirm_prompts() {
        let action = ConfirmAction::RemoveExporter(Address::repeat_byte(0x22));
        assert!(action.to_string().starts_with("Remove exporter 0x2222"));

        let decline = |_: &ConfirmAction| false;
        assert!(!decline.confirm(&action));
        assert!(AutoConfirm.confirm(&action));
        assert!(!AlwaysDecline.confirm(&action));
    }

    #[test]
    fn test_outcome_accessors() {
        let hash = DocumentHash::new([9; 32]);
        let outcome = VerificationOutcome::NotFound { hash };
        assert_eq!(outcome.hash(), hash);
        assert!(!outcome.is_found());
    }
}
