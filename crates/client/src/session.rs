//! Wallet sessions.
//!
//! A [`Session`] ties the active wallet account to a registry bound to that
//! account, together with the role the account holds on the contract. The
//! [`SessionManager`] owns at most one session and watches the wallet's
//! change notifications: when the account or network changes, the session is
//! dropped and everything that was started under it is treated as stale.
//!
//! Sessions are numbered by an epoch that increases with every connection,
//! so work captured under one session can be checked against the current one.

use std::fmt;
use std::sync::Arc;

use alloy_primitives::Address;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, instrument, warn};
use verichain_contracts::ContractDescriptor;

use crate::error::{ClientError, Result};
use crate::provider::{ProviderError, WalletEvent, WalletProvider};
use crate::registry::{DocumentRegistry, RegistryBinder};

/// What the connected account may do on the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The contract owner. Manages exporters and may act as an exporter.
    Owner,
    /// A registered exporter. Records and deletes documents.
    Exporter,
    /// Anyone else. Verification only.
    User,
}

impl Role {
    /// Derives the role of `account`; ownership takes precedence over exporter status.
    pub fn derive(account: Address, owner: Address, is_exporter: bool) -> Self {
        if account == owner {
            Self::Owner
        } else if is_exporter {
            Self::Exporter
        } else {
            Self::User
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Owner => "owner",
            Self::Exporter => "exporter",
            Self::User => "user",
        })
    }
}

/// Access level an operation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Only the contract owner.
    Owner,
    /// The owner or any exporter.
    OwnerOrExporter,
}

impl Access {
    /// Returns true if `role` satisfies this access level.
    pub const fn allows(&self, role: Role) -> bool {
        match self {
            Self::Owner => matches!(role, Role::Owner),
            Self::OwnerOrExporter => matches!(role, Role::Owner | Role::Exporter),
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Owner => "the contract owner",
            Self::OwnerOrExporter => "the owner or an exporter",
        })
    }
}

/// An established wallet session.
#[derive(Debug, Clone)]
pub struct Session<R> {
    account: Address,
    owner: Address,
    role: Role,
    registry: R,
    epoch: u64,
}

impl<R: DocumentRegistry> Session<R> {
    /// Returns the connected account.
    pub const fn account(&self) -> Address {
        self.account
    }

    /// Returns the contract owner as read when the role was last derived.
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Returns the account's role.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns the registry bound to this session's account.
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// Returns the contract address.
    pub fn contract(&self) -> Address {
        self.registry.address()
    }

    /// Returns the session epoch.
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Reads the network id the wallet is connected to.
///
/// Descriptors key deployments by network id (`net_version`), which differs
/// from the EIP-155 chain id on some development chains.
async fn network_id<P: WalletProvider>(provider: &P) -> Result<u64> {
    let raw = provider
        .request("net_version", serde_json::Value::Array(Vec::new()))
        .await?;
    raw.as_str()
        .and_then(|id| id.trim().parse().ok())
        .or_else(|| raw.as_u64())
        .ok_or_else(|| ProviderError::Transport(format!("invalid net_version response: {raw}")).into())
}

/// Owns the current wallet session and reacts to wallet notifications.
pub struct SessionManager<P, B: RegistryBinder<P>> {
    provider: Option<Arc<P>>,
    binder: B,
    events: Option<broadcast::Receiver<WalletEvent>>,
    session: Option<Session<B::Registry>>,
    invalidated: bool,
    epoch: u64,
}

impl<P, B: RegistryBinder<P>> fmt::Debug for SessionManager<P, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("has_provider", &self.provider.is_some())
            .field("session", &self.session)
            .field("invalidated", &self.invalidated)
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl<P, B> SessionManager<P, B>
where
    P: WalletProvider,
    B: RegistryBinder<P>,
{
    /// Creates a manager. `provider` is `None` when no wallet is installed.
    pub fn new(provider: Option<Arc<P>>, binder: B) -> Self {
        let events = provider.as_ref().map(|p| p.subscribe());
        Self {
            provider,
            binder,
            events,
            session: None,
            invalidated: false,
            epoch: 0,
        }
    }

    /// Returns true if a wallet provider is available.
    pub const fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Asks the wallet for authorization and establishes a session.
    ///
    /// # Errors
    ///
    /// - [`ClientError::WalletUnavailable`] if there is no provider
    /// - [`ClientError::DescriptorMissing`] if no descriptor was loaded
    /// - [`ClientError::AuthorizationDenied`] if the user rejected the request
    /// - [`ClientError::NoAccounts`] if the wallet returned no account
    /// - [`ClientError::WrongNetwork`] if the wallet is not on the descriptor's network
    /// - [`ClientError::ContractCall`] if the role could not be read
    #[instrument(skip_all)]
    pub async fn connect(
        &mut self,
        descriptor: Option<&ContractDescriptor>,
    ) -> Result<&Session<B::Registry>> {
        let provider = self.provider.clone().ok_or(ClientError::WalletUnavailable)?;
        let descriptor = descriptor.ok_or(ClientError::DescriptorMissing)?;
        self.discard_pending_events();

        let accounts = provider.request_accounts().await.map_err(|e| match e {
            ProviderError::UserRejected => ClientError::AuthorizationDenied,
            other => ClientError::Provider(other),
        })?;
        let account = *accounts.first().ok_or(ClientError::NoAccounts)?;

        self.establish(&provider, descriptor, account).await
    }

    /// Restores a session if the wallet already authorized an account, without prompting.
    ///
    /// Returns `Ok(None)` when there is no provider or no authorized account.
    #[instrument(skip_all)]
    pub async fn check_existing_session(
        &mut self,
        descriptor: Option<&ContractDescriptor>,
    ) -> Result<Option<&Session<B::Registry>>> {
        let Some(provider) = self.provider.clone() else {
            return Ok(None);
        };
        let descriptor = descriptor.ok_or(ClientError::DescriptorMissing)?;
        self.discard_pending_events();

        let accounts = provider.accounts().await?;
        let Some(account) = accounts.first().copied() else {
            debug!("no previously authorized account");
            return Ok(None);
        };

        self.establish(&provider, descriptor, account)
            .await
            .map(Some)
    }

    async fn establish(
        &mut self,
        provider: &Arc<P>,
        descriptor: &ContractDescriptor,
        account: Address,
    ) -> Result<&Session<B::Registry>> {
        let expected = descriptor.network();
        let actual = network_id(provider.as_ref()).await?;
        if actual != expected.id() {
            warn!(%expected, actual, "wallet is on another network");
            return Err(ClientError::WrongNetwork { expected, actual });
        }

        let registry = self.binder.bind(provider, descriptor.address(), account);
        let owner = registry.owner().await?;
        let is_exporter = registry.is_exporter(account).await?;
        let role = Role::derive(account, owner, is_exporter);

        self.epoch += 1;
        self.invalidated = false;
        info!(%account, %role, epoch = self.epoch, "wallet session established");

        Ok(&*self.session.insert(Session {
            account,
            owner,
            role,
            registry,
            epoch: self.epoch,
        }))
    }

    /// Applies one wallet notification.
    ///
    /// An account change to the session's own account is ignored; wallets
    /// send one when a connection is approved.
    pub fn handle_event(&mut self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => {
                if let Some(session) = &self.session {
                    if accounts.first() == Some(&session.account) {
                        debug!(account = %session.account, "active account unchanged");
                        return;
                    }
                }
                self.invalidate("account changed");
            }
            WalletEvent::ChainChanged(chain_id) => {
                debug!(chain_id, "network changed");
                self.invalidate("network changed");
            }
        }
    }

    /// Applies every pending wallet notification.
    ///
    /// Returns true if the session was dropped as a result.
    pub fn poll_events(&mut self) -> bool {
        let had_session = self.session.is_some();
        for event in self.drain_events() {
            self.handle_event(event);
        }
        had_session && self.session.is_none()
    }

    fn drain_events(&mut self) -> Vec<WalletEvent> {
        let mut pending = Vec::new();
        let Some(events) = self.events.as_mut() else {
            return pending;
        };
        loop {
            match events.try_recv() {
                Ok(event) => pending.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(missed)) => {
                    // Missed notifications may have included a switch.
                    warn!(missed, "wallet notifications dropped");
                    pending.push(WalletEvent::AccountsChanged(Vec::new()));
                }
                Err(TryRecvError::Closed) => {
                    self.events = None;
                    break;
                }
            }
        }
        pending
    }

    fn discard_pending_events(&mut self) {
        let discarded = self.drain_events().len();
        if discarded > 0 {
            debug!(discarded, "ignoring notifications from before this connection");
        }
    }

    /// Drops the current session; operations fail with [`ClientError::StaleSession`]
    /// until a new one is established.
    pub fn invalidate(&mut self, reason: &str) {
        if let Some(session) = self.session.take() {
            self.invalidated = true;
            warn!(account = %session.account, epoch = session.epoch, reason, "wallet session invalidated");
        }
    }

    /// Ends the session without marking it stale.
    pub fn disconnect(&mut self) {
        self.session = None;
        self.invalidated = false;
    }

    /// Returns the current session after applying pending notifications.
    ///
    /// # Errors
    ///
    /// - [`ClientError::StaleSession`] if the session was invalidated
    /// - [`ClientError::NotConnected`] if no session was ever established
    pub fn current(&mut self) -> Result<&Session<B::Registry>> {
        self.poll_events();
        match &self.session {
            Some(session) => Ok(session),
            None if self.invalidated => Err(ClientError::StaleSession),
            None => Err(ClientError::NotConnected),
        }
    }

    /// Returns the current session without applying notifications.
    pub const fn peek(&self) -> Option<&Session<B::Registry>> {
        self.session.as_ref()
    }

    /// Checks that the session from `epoch` is still the current one.
    pub fn ensure_epoch(&mut self, epoch: u64) -> Result<()> {
        match self.current() {
            Ok(session) if session.epoch == epoch => Ok(()),
            Ok(_) | Err(ClientError::StaleSession) => Err(ClientError::StaleSession),
            Err(other) => Err(other),
        }
    }

    /// Re-reads the owner and exporter status and updates the session's role.
    #[instrument(skip_all)]
    pub async fn refresh_role(&mut self) -> Result<Role> {
        let session = self.current()?;
        let (registry, account, epoch) = (session.registry.clone(), session.account, session.epoch);

        let owner = registry.owner().await?;
        let is_exporter = registry.is_exporter(account).await?;
        let role = Role::derive(account, owner, is_exporter);

        self.ensure_epoch(epoch)?;
        if let Some(session) = self.session.as_mut() {
            if session.role != role {
                info!(%account, from = %session.role, to = %role, "role changed");
            }
            session.owner = owner;
            session.role = role;
        }
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryChain, MemoryWallet};
    use verichain_networks::TARGET_NETWORK;

    const OWNER: Address = Address::repeat_byte(0x01);
    const EXPORTER: Address = Address::repeat_byte(0x02);
    const USER: Address = Address::repeat_byte(0x03);
    const FIXTURE: &str = include_str!("../../../fixtures/VeriChain.json");

    fn descriptor() -> ContractDescriptor {
        ContractDescriptor::from_json(FIXTURE.as_bytes(), TARGET_NETWORK).unwrap()
    }

    fn manager(
        wallet: MemoryWallet,
        chain: &MemoryChain,
    ) -> (Arc<MemoryWallet>, SessionManager<MemoryWallet, MemoryChain>) {
        let wallet = Arc::new(wallet);
        let manager = SessionManager::new(Some(Arc::clone(&wallet)), chain.clone());
        (wallet, manager)
    }

    #[test]
    fn test_role_derivation() {
        assert_eq!(Role::derive(OWNER, OWNER, true), Role::Owner);
        assert_eq!(Role::derive(EXPORTER, OWNER, true), Role::Exporter);
        assert_eq!(Role::derive(USER, OWNER, false), Role::User);

        assert!(Access::OwnerOrExporter.allows(Role::Owner));
        assert!(Access::OwnerOrExporter.allows(Role::Exporter));
        assert!(!Access::Owner.allows(Role::Exporter));
        assert!(!Access::OwnerOrExporter.allows(Role::User));
    }

    #[tokio::test]
    async fn test_connect_derives_role() {
        let chain = MemoryChain::new(OWNER).with_exporter(EXPORTER, "Registrar");
        let descriptor = descriptor();

        for (account, role) in [(OWNER, Role::Owner), (EXPORTER, Role::Exporter), (USER, Role::User)] {
            let (_wallet, mut manager) = manager(MemoryWallet::new(vec![account]), &chain);
            let session = manager.connect(Some(&descriptor)).await.unwrap();
            assert_eq!(session.account(), account);
            assert_eq!(session.role(), role);
            assert_eq!(session.contract(), descriptor.address());
        }
    }

    #[tokio::test]
    async fn test_connect_preconditions() {
        let chain = MemoryChain::new(OWNER);
        let descriptor = descriptor();

        let mut no_wallet = SessionManager::<MemoryWallet, _>::new(None, chain.clone());
        assert!(matches!(
            no_wallet.connect(Some(&descriptor)).await,
            Err(ClientError::WalletUnavailable)
        ));

        let (wallet, mut manager) = manager(MemoryWallet::new(vec![OWNER]), &chain);
        assert!(matches!(manager.connect(None).await, Err(ClientError::DescriptorMissing)));

        wallet.set_rejects(true);
        assert!(matches!(
            manager.connect(Some(&descriptor)).await,
            Err(ClientError::AuthorizationDenied)
        ));

        let (_wallet, mut empty) = manager_with_no_accounts(&chain);
        assert!(matches!(empty.connect(Some(&descriptor)).await, Err(ClientError::NoAccounts)));
        assert_eq!(chain.call_count(), 0);
    }

    fn manager_with_no_accounts(
        chain: &MemoryChain,
    ) -> (Arc<MemoryWallet>, SessionManager<MemoryWallet, MemoryChain>) {
        manager(MemoryWallet::new(Vec::new()), chain)
    }

    #[tokio::test]
    async fn test_check_existing_session() {
        let chain = MemoryChain::new(OWNER);
        let descriptor = descriptor();

        let (_wallet, mut fresh) = manager(MemoryWallet::new(vec![OWNER]), &chain);
        assert!(fresh.check_existing_session(Some(&descriptor)).await.unwrap().is_none());

        let (_wallet, mut returning) = manager(MemoryWallet::authorized(vec![OWNER]), &chain);
        let session = returning
            .check_existing_session(Some(&descriptor))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.role(), Role::Owner);
    }

    #[tokio::test]
    async fn test_account_switch_invalidates() {
        let chain = MemoryChain::new(OWNER);
        let descriptor = descriptor();
        let (wallet, mut manager) = manager(MemoryWallet::new(vec![OWNER, USER]), &chain);

        let epoch = manager.connect(Some(&descriptor)).await.unwrap().epoch();

        // A notification for the account already in use changes nothing.
        wallet.switch_account(OWNER);
        assert!(manager.ensure_epoch(epoch).is_ok());

        wallet.switch_account(USER);
        assert!(matches!(manager.ensure_epoch(epoch), Err(ClientError::StaleSession)));
        assert!(matches!(manager.current(), Err(ClientError::StaleSession)));

        let session = manager.connect(Some(&descriptor)).await.unwrap();
        assert_eq!(session.account(), USER);
        assert_eq!(session.role(), Role::User);
        assert!(session.epoch() > epoch);
        assert!(matches!(manager.ensure_epoch(epoch), Err(ClientError::StaleSession)));
    }

    #[tokio::test]
    async fn test_chain_switch_invalidates() {
        let chain = MemoryChain::new(OWNER);
        let descriptor = descriptor();
        let (wallet, mut manager) = manager(MemoryWallet::new(vec![OWNER]), &chain);
        manager.connect(Some(&descriptor)).await.unwrap();

        wallet.switch_chain(1);
        assert!(manager.poll_events());
        assert!(manager.peek().is_none());

        manager.disconnect();
        assert!(matches!(manager.current(), Err(ClientError::NotConnected)));
    }

    #[tokio::test]
    async fn test_reconnect_requires_descriptor_network() {
        let chain = MemoryChain::new(OWNER);
        let descriptor = descriptor();
        let (wallet, mut manager) = manager(MemoryWallet::authorized(vec![OWNER]), &chain);
        manager.connect(Some(&descriptor)).await.unwrap();
        let calls = chain.call_count();

        wallet.switch_chain(1);
        assert!(manager.poll_events());

        assert!(matches!(
            manager.connect(Some(&descriptor)).await,
            Err(ClientError::WrongNetwork { expected, actual: 1 }) if expected == TARGET_NETWORK
        ));
        assert!(matches!(
            manager.check_existing_session(Some(&descriptor)).await,
            Err(ClientError::WrongNetwork { .. })
        ));
        assert!(manager.peek().is_none());
        assert_eq!(chain.call_count(), calls);

        wallet.switch_chain(5777);
        let session = manager.connect(Some(&descriptor)).await.unwrap();
        assert_eq!(session.role(), Role::Owner);
    }

    #[tokio::test]
    async fn test_refresh_role_after_transfer() {
        let chain = MemoryChain::new(OWNER);
        let descriptor = descriptor();
        let (_wallet, mut manager) = manager(MemoryWallet::new(vec![OWNER]), &chain);

        let registry = manager.connect(Some(&descriptor)).await.unwrap().registry().clone();
        let call = crate::registry::WriteCall::ChangeOwner { new_owner: USER };
        let gas = registry.estimate_gas(&call).await.unwrap();
        registry.send(&call, gas).await.unwrap();

        assert_eq!(manager.refresh_role().await.unwrap(), Role::User);
        assert_eq!(manager.current().unwrap().owner(), USER);
    }
}
