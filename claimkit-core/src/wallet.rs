//! Multi-identity container with DID-based routing.
//!
//! A [`Wallet`] owns an ordered sequence of accounts and a directory mapping
//! each account's DID to its index. Claims are routed to accounts by their
//! `ownerDID`. The directory is always derived from the accounts themselves;
//! the copy persisted in a [`WalletRecord`] is written for readers of the
//! file but never trusted on reload.
//!
//! Registering a second account under an existing DID moves the directory
//! entry to the newer account. The older account stays in the sequence and
//! is reachable by index only.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::account::{Account, AccountRecord};
use crate::claim::Claim;
use crate::crypto::KdfParams;
use crate::defaults::WALLET_RECORD_VERSION;
use crate::error::{ClaimKitError, ClaimKitResult};
use crate::identity::{IdentityPrimitive, LocalIdentity};
use crate::network::DidNetwork;

/// An account, or the persisted record to build one from.
#[derive(Debug, Clone)]
pub enum AccountInput<I = LocalIdentity> {
    /// A live account; keeps its own network.
    Account(Account<I>),
    /// A persisted record; the network comes from the caller or the record.
    Record(AccountRecord),
}

impl<I> From<Account<I>> for AccountInput<I> {
    fn from(account: Account<I>) -> Self {
        Self::Account(account)
    }
}

impl<I> From<AccountRecord> for AccountInput<I> {
    fn from(record: AccountRecord) -> Self {
        Self::Record(record)
    }
}

/// Persisted form of a wallet.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    /// Wallet name.
    pub name: String,
    /// Record format version.
    #[serde(default = "default_record_version")]
    pub version: String,
    /// Exported accounts, in wallet order.
    #[serde(default)]
    pub accounts: Vec<AccountRecord>,
    /// DID to account index, as it was at export time. Ignored on reload.
    #[serde(default)]
    pub did_map: BTreeMap<String, usize>,
}

fn default_record_version() -> String {
    WALLET_RECORD_VERSION.to_string()
}

/// A named collection of accounts with DID routing.
#[derive(Debug, Clone)]
pub struct Wallet<I = LocalIdentity> {
    name: String,
    accounts: Vec<Account<I>>,
    directory: HashMap<String, usize>,
}

impl<I: IdentityPrimitive> Wallet<I> {
    /// Creates an empty wallet.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accounts: Vec::new(),
            directory: HashMap::new(),
        }
    }

    /// Rebuilds a wallet from its persisted record.
    ///
    /// Every account is reconstructed (locked if its key material is locked)
    /// and the directory is recomputed from the accounts. The record's
    /// `didMap` is discarded.
    ///
    /// # Errors
    ///
    /// - [`ClaimKitError::UnsupportedVersion`] for an unknown record version.
    /// - [`ClaimKitError::MissingDidNetwork`] if an account record carries no
    ///   DID network.
    /// - Identity errors for malformed key fields.
    pub fn from_record(record: WalletRecord) -> ClaimKitResult<Self> {
        if record.version != WALLET_RECORD_VERSION {
            return Err(ClaimKitError::UnsupportedVersion(record.version));
        }
        let mut wallet = Self::new(record.name);
        for account in record.accounts {
            wallet.add_account(account)?;
        }

        let stale = record.did_map.len() != wallet.directory.len()
            || record
                .did_map
                .iter()
                .any(|(did, index)| wallet.directory.get(did) != Some(index));
        if stale {
            log::info!(
                "wallet {}: persisted DID map is stale, using the recomputed directory",
                wallet.name
            );
        }
        log::debug!("loaded wallet {} with {} accounts", wallet.name, wallet.len());
        Ok(wallet)
    }

    /// Parses a wallet from its JSON record.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::Serialization`] for malformed JSON, otherwise
    /// as [`Wallet::from_record`].
    pub fn from_json(json: &str) -> ClaimKitResult<Self> {
        Self::from_record(serde_json::from_str(json)?)
    }

    /// Wallet name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All accounts in insertion order.
    #[must_use]
    pub fn accounts(&self) -> &[Account<I>] {
        &self.accounts
    }

    /// Number of accounts, including ones shadowed by a later duplicate DID.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the wallet holds no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// The account at `index`.
    #[must_use]
    pub fn account(&self, index: usize) -> Option<&Account<I>> {
        self.accounts.get(index)
    }

    /// The account flagged as default, else the first one.
    #[must_use]
    pub fn default_account(&self) -> Option<&Account<I>> {
        self.accounts
            .iter()
            .find(|account| account.is_default())
            .or_else(|| self.accounts.first())
    }

    /// Makes the account registered for `did` the only default account.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::UnknownDid`] if no account is registered for
    /// `did`.
    pub fn set_default_account(&mut self, did: &str) -> ClaimKitResult<()> {
        let index = *self.directory.get(did).ok_or_else(|| ClaimKitError::UnknownDid {
            did: did.to_string(),
        })?;
        for (i, account) in self.accounts.iter_mut().enumerate() {
            account.set_default(i == index);
        }
        Ok(())
    }

    /// Appends an account and registers its DID. Returns its index.
    ///
    /// A record is turned into an account for `network`; a live account
    /// keeps its own network.
    ///
    /// # Errors
    ///
    /// Returns an error if a record's key fields are malformed.
    pub fn add_did_account(
        &mut self,
        input: impl Into<AccountInput<I>>,
        network: DidNetwork,
    ) -> ClaimKitResult<usize> {
        let account = match input.into() {
            AccountInput::Account(account) => account,
            AccountInput::Record(record) => Account::from_record(record, network)?,
        };
        Ok(self.register(account))
    }

    /// Appends an account, taking the DID network from the account itself or
    /// from the record's extensions. Returns its index.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::MissingDidNetwork`] if a record carries no
    /// network, or an error if its key fields are malformed.
    pub fn add_account(&mut self, input: impl Into<AccountInput<I>>) -> ClaimKitResult<usize> {
        match input.into() {
            AccountInput::Account(account) => Ok(self.register(account)),
            AccountInput::Record(record) => {
                let network = record.did_network().ok_or(ClaimKitError::MissingDidNetwork)?;
                self.add_did_account(record, network)
            }
        }
    }

    /// Generates a new key pair, adds an account for it on `network`, and
    /// returns the account's DID.
    pub fn create_did(&mut self, network: DidNetwork) -> String {
        let account = Account::generate(network);
        let did = account.did();
        let index = self.register(account);
        log::info!("created {did} at index {index}");
        did
    }

    /// Routes `claim` to the account registered for its owner DID.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::UnknownDid`] if no account is registered for
    /// the owner, otherwise whatever [`Account::add_claim`] returns.
    pub fn add_claim(&mut self, claim: Claim) -> ClaimKitResult<()> {
        let account = self
            .account_by_did_mut(claim.owner_did())
            .ok_or_else(|| ClaimKitError::UnknownDid {
                did: claim.owner_did().to_string(),
            })?;
        account.add_claim(claim)
    }

    /// Returns the first claim with `id`, scanning accounts in order.
    /// Locked accounts are skipped.
    #[must_use]
    pub fn get_claim(&self, id: &str) -> Option<&Claim> {
        self.accounts
            .iter()
            .filter(|account| !account.is_locked())
            .find_map(|account| account.get_claim(id).ok().flatten())
    }

    /// Returns the claims of the account registered for `did`, or an empty
    /// list if the DID is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::LockedAccount`] if that account is locked.
    pub fn get_all_claims(&self, did: &str) -> ClaimKitResult<Vec<&Claim>> {
        self.get_account_by_did(did)
            .map_or_else(|| Ok(Vec::new()), Account::get_all_claims)
    }

    /// DID of the account at `index`.
    #[must_use]
    pub fn get_did(&self, index: usize) -> Option<String> {
        self.accounts.get(index).map(Account::did)
    }

    /// The account registered for `did`.
    #[must_use]
    pub fn get_account_by_did(&self, did: &str) -> Option<&Account<I>> {
        self.directory
            .get(did)
            .and_then(|index| self.accounts.get(*index))
    }

    /// Mutable access to the account registered for `did`.
    pub fn account_by_did_mut(&mut self, did: &str) -> Option<&mut Account<I>> {
        let index = *self.directory.get(did)?;
        self.accounts.get_mut(index)
    }

    /// All registered DIDs, ordered by account index.
    #[must_use]
    pub fn get_all_dids(&self) -> Vec<String> {
        let mut entries: Vec<(&String, &usize)> = self.directory.iter().collect();
        entries.sort_by_key(|(_, index)| **index);
        entries.into_iter().map(|(did, _)| did.clone()).collect()
    }

    /// Seals every unlocked account, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing account. Accounts before it stay locked.
    pub async fn encrypt_all(&mut self, passphrase: &str, kdf: Option<KdfParams>) -> ClaimKitResult<()> {
        for account in self.accounts.iter_mut().filter(|account| !account.is_locked()) {
            account.encrypt(passphrase, kdf).await?;
        }
        Ok(())
    }

    /// Unlocks every locked account, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing account. Accounts before it stay unlocked.
    pub async fn decrypt_all(&mut self, passphrase: &str, kdf: Option<KdfParams>) -> ClaimKitResult<()> {
        for account in self.accounts.iter_mut().filter(|account| account.is_locked()) {
            account.decrypt(passphrase, kdf).await?;
        }
        Ok(())
    }

    /// Returns the persistable record.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::NotEncrypted`] if any account was never
    /// encrypted.
    pub fn export(&self) -> ClaimKitResult<WalletRecord> {
        let accounts = self
            .accounts
            .iter()
            .map(Account::export)
            .collect::<ClaimKitResult<Vec<_>>>()?;
        log::debug!("exporting wallet {} with {} accounts", self.name, accounts.len());
        Ok(WalletRecord {
            name: self.name.clone(),
            version: WALLET_RECORD_VERSION.to_string(),
            accounts,
            did_map: self
                .directory
                .iter()
                .map(|(did, index)| (did.clone(), *index))
                .collect(),
        })
    }

    /// Exports the wallet as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// As [`Wallet::export`].
    pub fn to_json(&self) -> ClaimKitResult<String> {
        Ok(serde_json::to_string_pretty(&self.export()?)?)
    }

    fn register(&mut self, account: Account<I>) -> usize {
        let did = account.did();
        let index = self.accounts.len();
        self.accounts.push(account);
        if let Some(previous) = self.directory.insert(did.clone(), index) {
            log::warn!("{did} re-registered at index {index}; account {previous} is reachable by index only");
        }
        index
    }
}
