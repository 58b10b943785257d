//! Single-DID claim store with a lock state machine.
//!
//! An [`Account`] wraps an identity primitive and keeps the claims issued to
//! its DID. Plaintext claims are readable and writable only while the account
//! is [`LockState::Unlocked`]. [`Account::encrypt`] seals both the private key
//! and the claim set under a passphrase and moves the account to
//! [`LockState::Locked`]; [`Account::decrypt`] reverses it.
//!
//! ```text
//!             encrypt(pw)
//!   Unlocked ─────────────▶ Locked
//!      ▲                      │
//!      └──────────────────────┘
//!             decrypt(pw)
//! ```
//!
//! `encrypt` and `decrypt` stretch the passphrase on a blocking worker and
//! must run inside a Tokio runtime. They operate on copies of the account
//! state and commit only on success, so a failed call leaves the account
//! exactly as it was.

use std::collections::BTreeMap;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::claim::Claim;
use crate::crypto::{KdfParams, SealedBox};
use crate::defaults::{DID_METHOD, DID_NETWORK_KEY, LABEL_CLAIMS};
use crate::error::{ClaimKitError, ClaimKitResult};
use crate::identity::{IdentityPrimitive, KeyRecord, LocalIdentity};
use crate::network::DidNetwork;

/// Whether an account's plaintext claims are accessible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Claims are held in plaintext and may be read or added.
    Unlocked,
    /// Only the sealed form exists; decrypt before use.
    Locked,
}

/// Persisted form of an account. Claims appear only as ciphertext.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    /// Key fields supplied by the identity primitive.
    #[serde(flatten)]
    pub key: KeyRecord,
    /// Optional human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Whether this is the wallet's default account.
    #[serde(default)]
    pub is_default: bool,
    /// Sealed claim set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<String>,
    /// Extension metadata; carries the DID network under `didNetwork`.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl AccountRecord {
    /// The DID network recorded in `extra`, if present and non-empty.
    #[must_use]
    pub fn did_network(&self) -> Option<DidNetwork> {
        self.extra
            .get(DID_NETWORK_KEY)
            .and_then(|name| DidNetwork::parse(name))
    }
}

/// Claim store for one DID.
#[derive(Debug, Clone)]
pub struct Account<I = LocalIdentity> {
    identity: I,
    network: DidNetwork,
    label: Option<String>,
    is_default: bool,
    claims: BTreeMap<String, Claim>,
    encrypted_claims: Option<String>,
    lock_state: LockState,
    extensions: BTreeMap<String, String>,
}

impl<I: IdentityPrimitive> Account<I> {
    /// Creates an empty, unlocked account around existing key material.
    #[must_use]
    pub const fn new(identity: I, network: DidNetwork) -> Self {
        Self {
            identity,
            network,
            label: None,
            is_default: false,
            claims: BTreeMap::new(),
            encrypted_claims: None,
            lock_state: LockState::Unlocked,
            extensions: BTreeMap::new(),
        }
    }

    /// Creates an empty account with freshly generated key material.
    #[must_use]
    pub fn generate(network: DidNetwork) -> Self {
        Self::new(I::generate(), network)
    }

    /// Reconstructs an account from its persisted record for `network`.
    ///
    /// The account starts locked when its key material is locked, or when it
    /// carries sealed claims with no key to lock (watch-only).
    ///
    /// # Errors
    ///
    /// Returns an error if the identity primitive rejects the key fields.
    pub fn from_record(record: AccountRecord, network: DidNetwork) -> ClaimKitResult<Self> {
        let identity = I::from_record(&record.key)?;
        let lock_state = if identity.is_locked() || record.claims.is_some() {
            LockState::Locked
        } else {
            LockState::Unlocked
        };
        let mut extensions = record.extra;
        extensions.remove(DID_NETWORK_KEY);

        Ok(Self {
            identity,
            network,
            label: record.label,
            is_default: record.is_default,
            claims: BTreeMap::new(),
            encrypted_claims: record.claims,
            lock_state,
            extensions,
        })
    }

    /// The DID of this account: `did:<method>:<network>:<address>`.
    #[must_use]
    pub fn did(&self) -> String {
        format!("did:{DID_METHOD}:{}:{}", self.network, self.address())
    }

    /// The address of the underlying key pair.
    #[must_use]
    pub fn address(&self) -> String {
        self.identity.derive_address()
    }

    /// Hex-encoded public key, when the key material is unlocked.
    #[must_use]
    pub fn public_key(&self) -> Option<String> {
        self.identity.public_key()
    }

    /// The DID network this account is used on.
    #[must_use]
    pub const fn network(&self) -> &DidNetwork {
        &self.network
    }

    /// The underlying identity primitive.
    #[must_use]
    pub const fn identity(&self) -> &I {
        &self.identity
    }

    /// Optional label.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Sets or clears the label.
    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    /// Whether the account is flagged as the wallet default.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        self.is_default
    }

    /// Flags or unflags the account as the wallet default.
    pub fn set_default(&mut self, is_default: bool) {
        self.is_default = is_default;
    }

    /// Current lock state.
    #[must_use]
    pub const fn lock_state(&self) -> LockState {
        self.lock_state
    }

    /// Whether the account is locked.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock_state == LockState::Locked
    }

    /// Whether a sealed claim set exists.
    #[must_use]
    pub const fn has_encrypted_claims(&self) -> bool {
        self.encrypted_claims.is_some()
    }

    /// Extension metadata carried through import and export, excluding the
    /// DID network.
    #[must_use]
    pub const fn extensions(&self) -> &BTreeMap<String, String> {
        &self.extensions
    }

    /// Adds a claim.
    ///
    /// # Errors
    ///
    /// - [`ClaimKitError::InvalidClaim`] if the claim has no id, or holds a
    ///   timestamp that could not be sealed and read back.
    /// - [`ClaimKitError::LockedAccount`] if the account is locked.
    /// - [`ClaimKitError::DuplicateClaim`] if a claim with the same id exists;
    ///   the stored claim is left untouched.
    pub fn add_claim(&mut self, claim: Claim) -> ClaimKitResult<()> {
        if claim.id().is_empty() {
            return Err(ClaimKitError::InvalidClaim("claim has no id".to_string()));
        }
        claim.ensure_encodable()?;
        self.ensure_unlocked()?;
        if self.claims.contains_key(claim.id()) {
            return Err(ClaimKitError::DuplicateClaim {
                id: claim.id().to_string(),
            });
        }
        log::debug!("adding claim {} to {}", claim.id(), self.did());
        self.claims.insert(claim.id().to_string(), claim);
        Ok(())
    }

    /// Returns the claim with `id`, if stored.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::LockedAccount`] if the account is locked.
    pub fn get_claim(&self, id: &str) -> ClaimKitResult<Option<&Claim>> {
        self.ensure_unlocked()?;
        Ok(self.claims.get(id))
    }

    /// Returns all stored claims, ordered by claim id.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::LockedAccount`] if the account is locked.
    pub fn get_all_claims(&self) -> ClaimKitResult<Vec<&Claim>> {
        self.ensure_unlocked()?;
        Ok(self.claims.values().collect())
    }

    /// Seals the key material and the claim set under `passphrase` and locks
    /// the account. The plaintext claims are dropped from memory.
    ///
    /// Uses `kdf` or [`KdfParams::default`]; the parameters are recorded in
    /// the ciphertext.
    ///
    /// # Errors
    ///
    /// - [`ClaimKitError::LockedAccount`] if the account is already locked;
    ///   sealing would replace the ciphertext with an empty set.
    /// - Identity, crypto or worker errors. The account is unchanged on error.
    pub async fn encrypt(&mut self, passphrase: &str, kdf: Option<KdfParams>) -> ClaimKitResult<()> {
        self.ensure_unlocked()?;
        let params = kdf.unwrap_or_default();
        let passphrase = SecretString::from(passphrase.to_owned());
        let mut identity = self.identity.clone();
        let binding = self.address();
        let plaintext = Zeroizing::new(serde_json::to_vec(&self.claims)?);

        let (identity, encrypted) = run_blocking(move || {
            identity.encrypt(&passphrase, &params)?;
            let sealed = SealedBox::seal(
                &passphrase,
                &params,
                LABEL_CLAIMS,
                binding.as_bytes(),
                &plaintext,
            )?;
            Ok((identity, sealed.encode()?))
        })
        .await?;

        self.identity = identity;
        self.encrypted_claims = Some(encrypted);
        self.claims.clear();
        self.lock_state = LockState::Locked;
        log::debug!("locked account {}", self.did());
        Ok(())
    }

    /// Unlocks the key material and restores the claim set from its sealed
    /// form. With no sealed claims the claim set becomes empty.
    ///
    /// `kdf` overrides the parameters recorded in the ciphertext.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::DecryptionFailure`] on a wrong passphrase or
    /// corrupted ciphertext, never a partially decoded claim set. The account
    /// is unchanged on error.
    pub async fn decrypt(&mut self, passphrase: &str, kdf: Option<KdfParams>) -> ClaimKitResult<()> {
        let passphrase = SecretString::from(passphrase.to_owned());
        let mut identity = self.identity.clone();
        let binding = self.address();
        let encrypted = self.encrypted_claims.clone();

        let (identity, claims) = run_blocking(move || {
            identity.decrypt(&passphrase, kdf.as_ref())?;
            let claims = match encrypted {
                Some(encrypted) => open_claims(&encrypted, &passphrase, kdf.as_ref(), &binding)?,
                None => BTreeMap::new(),
            };
            Ok((identity, claims))
        })
        .await?;

        self.identity = identity;
        self.claims = claims;
        self.lock_state = LockState::Unlocked;
        log::debug!("unlocked account {}", self.did());
        Ok(())
    }

    /// Returns the persistable record: key fields, sealed claims and
    /// extensions (with the DID network).
    ///
    /// The sealed claims are those produced by the latest [`Account::encrypt`];
    /// claims added after it are not included until the next encrypt.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::NotEncrypted`] if the account was never
    /// encrypted. Plaintext claims are never exported.
    pub fn export(&self) -> ClaimKitResult<AccountRecord> {
        let Some(claims) = &self.encrypted_claims else {
            return Err(ClaimKitError::NotEncrypted);
        };
        let mut extra = self.extensions.clone();
        extra.insert(DID_NETWORK_KEY.to_string(), self.network.to_string());

        Ok(AccountRecord {
            key: self.identity.to_record()?,
            label: self.label.clone(),
            is_default: self.is_default,
            claims: Some(claims.clone()),
            extra,
        })
    }

    fn ensure_unlocked(&self) -> ClaimKitResult<()> {
        if self.is_locked() {
            return Err(ClaimKitError::LockedAccount);
        }
        Ok(())
    }
}

fn open_claims(
    encrypted: &str,
    passphrase: &SecretString,
    kdf: Option<&KdfParams>,
    binding: &str,
) -> ClaimKitResult<BTreeMap<String, Claim>> {
    let sealed = SealedBox::decode(encrypted)
        .map_err(|err| ClaimKitError::decryption(format!("corrupted claims ciphertext: {err}")))?;
    let plaintext = sealed.open(passphrase, kdf, LABEL_CLAIMS, binding.as_bytes())?;
    let claims: BTreeMap<String, Claim> = serde_json::from_slice(&plaintext)
        .map_err(|err| ClaimKitError::decryption(format!("claims are not parseable: {err}")))?;
    if let Some((key, claim)) = claims.iter().find(|(key, claim)| key.as_str() != claim.id()) {
        return Err(ClaimKitError::decryption(format!(
            "claim stored under `{key}` has id `{}`",
            claim.id()
        )));
    }
    Ok(claims)
}

async fn run_blocking<T, F>(f: F) -> ClaimKitResult<T>
where
    F: FnOnce() -> ClaimKitResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| ClaimKitError::Task(err.to_string()))?
}
