//! Passphrase-based sealing for key material and claim sets.
//!
//! Content is encrypted with `XChaCha20-Poly1305` under a 256-bit key stretched
//! from the passphrase with Argon2id. Every sealed payload is stored as a
//! versioned [`SealedBox`] carrying its own salt, nonce and KDF parameters,
//! CBOR-encoded and then base64-encoded so it fits in a JSON string field.
//!
//! Associated data is `label || binding`, where the label separates the
//! payload kinds (private key vs. claims) and the binding ties the payload to
//! one account address.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::defaults::SEALED_BOX_VERSION;
use crate::error::{ClaimKitError, ClaimKitResult};

/// Nonce length for `XChaCha20-Poly1305`.
pub const NONCE_SIZE: usize = 24;

/// Salt length for the passphrase KDF.
pub const SALT_SIZE: usize = 16;

const KEY_SIZE: usize = 32;

/// Cost parameters for the passphrase-to-key derivation (Argon2id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfParams {
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
}

impl KdfParams {
    /// Creates KDF parameters, validating them against the Argon2 limits.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::Crypto`] if the parameters are out of range
    /// (e.g. less than `8 * parallelism` kibibytes of memory).
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> ClaimKitResult<Self> {
        let params = Self {
            memory_kib,
            iterations,
            parallelism,
        };
        params.argon2_params()?;
        Ok(params)
    }

    /// Memory cost in kibibytes.
    #[must_use]
    pub const fn memory_kib(&self) -> u32 {
        self.memory_kib
    }

    /// Number of passes.
    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Degree of parallelism.
    #[must_use]
    pub const fn parallelism(&self) -> u32 {
        self.parallelism
    }

    fn argon2_params(&self) -> ClaimKitResult<Params> {
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_SIZE),
        )
        .map_err(|err| ClaimKitError::Crypto(format!("invalid KDF parameters: {err}")))
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Symmetric key derived from a passphrase. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct SealingKey([u8; KEY_SIZE]);

impl SealingKey {
    fn derive(passphrase: &SecretString, salt: &[u8], params: &KdfParams) -> ClaimKitResult<Self> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.argon2_params()?);
        let mut key = [0u8; KEY_SIZE];
        argon2
            .hash_password_into(passphrase.expose_secret().as_bytes(), salt, &mut key)
            .map_err(|err| ClaimKitError::Crypto(format!("key derivation failed: {err}")))?;
        Ok(Self(key))
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(&self.0))
    }
}

fn build_associated_data(label: &[u8], binding: &[u8]) -> Vec<u8> {
    let mut aad = Vec::with_capacity(label.len() + binding.len());
    aad.extend_from_slice(label);
    aad.extend_from_slice(binding);
    aad
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// A passphrase-sealed payload with everything needed to open it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBox {
    version: u32,
    kdf: KdfParams,
    salt: Vec<u8>,
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
}

impl SealedBox {
    /// Seals `plaintext` under a key derived from `passphrase`.
    ///
    /// A fresh random salt and nonce are drawn for every call.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::Crypto`] if key derivation or encryption fails.
    pub fn seal(
        passphrase: &SecretString,
        params: &KdfParams,
        label: &[u8],
        binding: &[u8],
        plaintext: &[u8],
    ) -> ClaimKitResult<Self> {
        let salt = random_bytes::<SALT_SIZE>();
        let nonce = random_bytes::<NONCE_SIZE>();
        let key = SealingKey::derive(passphrase, &salt, params)?;
        let aad = build_associated_data(label, binding);

        let ciphertext = key
            .cipher()
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|_| ClaimKitError::Crypto("XChaCha20-Poly1305 encryption failed".to_string()))?;

        Ok(Self {
            version: SEALED_BOX_VERSION,
            kdf: *params,
            salt: salt.to_vec(),
            nonce: nonce.to_vec(),
            ciphertext,
        })
    }

    /// Opens the box with `passphrase`.
    ///
    /// The KDF parameters recorded at sealing time are used unless `params`
    /// overrides them.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::DecryptionFailure`] on a wrong passphrase,
    /// mismatched label or binding, or tampered ciphertext.
    pub fn open(
        &self,
        passphrase: &SecretString,
        params: Option<&KdfParams>,
        label: &[u8],
        binding: &[u8],
    ) -> ClaimKitResult<Zeroizing<Vec<u8>>> {
        if self.nonce.len() != NONCE_SIZE {
            return Err(ClaimKitError::decryption(format!(
                "invalid nonce length: expected {NONCE_SIZE}, got {}",
                self.nonce.len()
            )));
        }
        let key = SealingKey::derive(passphrase, &self.salt, params.unwrap_or(&self.kdf))?;
        let aad = build_associated_data(label, binding);

        key.cipher()
            .decrypt(
                XNonce::from_slice(&self.nonce),
                Payload {
                    msg: &self.ciphertext,
                    aad: &aad,
                },
            )
            .map(Zeroizing::new)
            .map_err(|_| {
                ClaimKitError::decryption("wrong passphrase or corrupted ciphertext")
            })
    }

    /// KDF parameters recorded at sealing time.
    #[must_use]
    pub const fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    /// Encodes the box as a base64 string for the transport record.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::Serialization`] if CBOR encoding fails.
    pub fn encode(&self) -> ClaimKitResult<String> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)
            .map_err(|err| ClaimKitError::serialization(err.to_string()))?;
        Ok(BASE64.encode(bytes))
    }

    /// Decodes a box from its transport string.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimKitError::Serialization`] for malformed input and
    /// [`ClaimKitError::UnsupportedVersion`] for an unknown envelope version.
    pub fn decode(encoded: &str) -> ClaimKitResult<Self> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|err| ClaimKitError::serialization(format!("invalid base64: {err}")))?;
        let sealed: Self = ciborium::de::from_reader(bytes.as_slice())
            .map_err(|err| ClaimKitError::serialization(err.to_string()))?;
        if sealed.version != SEALED_BOX_VERSION {
            return Err(ClaimKitError::UnsupportedVersion(sealed.version.to_string()));
        }
        Ok(sealed)
    }
}
