//! Holder-side store for DID claims.
//!
//! Each [`Account`] keeps the claims issued to one DID and can seal them,
//! together with its private key, under a passphrase. A [`Wallet`] groups
//! accounts and routes claims to them by owner DID. Persisted records only
//! ever carry sealed claims.

#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod account;
pub use account::*;

mod claim;
pub use claim::*;

mod error;
pub use error::*;

mod issuer;
pub use issuer::*;

mod network;
pub use network::*;

mod wallet;
pub use wallet::*;

pub mod codec;

pub mod crypto;
pub use crypto::{KdfParams, SealedBox};

pub mod defaults;

pub mod identity;
pub use identity::{IdentityPrimitive, KeyRecord, LocalIdentity};

pub mod logger;
