//! Protocol constants shared by accounts, wallets and their persisted records.

/// DID method segment. DIDs read `did:<method>:<network>:<address>`.
pub const DID_METHOD: &str = "claim";

/// Key in an account record's `extra` map that carries the DID network.
pub const DID_NETWORK_KEY: &str = "didNetwork";

/// Format version written to exported wallet records.
pub const WALLET_RECORD_VERSION: &str = "1.0";

/// Format version of sealed key and claim envelopes.
pub const SEALED_BOX_VERSION: u32 = 1;

/// Domain separation for the sealed private key.
pub(crate) const LABEL_PRIVATE_KEY: &[u8] = b"claimkit:private-key";

/// Domain separation for the sealed claim set.
pub(crate) const LABEL_CLAIMS: &[u8] = b"claimkit:claims";

/// Version byte prepended to the address payload before base58check encoding.
pub(crate) const ADDRESS_VERSION: u8 = 0x17;
