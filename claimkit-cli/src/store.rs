//! Wallet file handling: load, unlock, seal and atomic rewrite.

use std::fs;
use std::path::{Path, PathBuf};

use claimkit_core::{KdfParams, Wallet};
use eyre::{eyre, WrapErr};
use secrecy::{ExposeSecret, SecretString};

/// `<data_dir>/claimkit/wallet.json`.
pub fn default_wallet_path() -> eyre::Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("claimkit").join("wallet.json"))
        .ok_or_else(|| eyre!("could not determine a data directory; pass --wallet"))
}

/// Reads the wallet file and unlocks every account.
pub async fn open(path: &Path, passphrase: &SecretString) -> eyre::Result<Wallet> {
    let json = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read wallet file {}", path.display()))?;
    let mut wallet = Wallet::from_json(&json)
        .wrap_err_with(|| format!("failed to parse wallet file {}", path.display()))?;
    wallet
        .decrypt_all(passphrase.expose_secret(), None)
        .await
        .wrap_err("failed to unlock wallet")?;
    tracing::debug!(path = %path.display(), accounts = wallet.len(), "wallet unlocked");
    Ok(wallet)
}

/// Seals every account and replaces the wallet file.
///
/// The new content is written to a sibling temp file first and renamed over
/// the target, so readers never observe a partially written wallet.
pub async fn seal(
    path: &Path,
    wallet: &mut Wallet,
    passphrase: &SecretString,
    kdf: Option<KdfParams>,
) -> eyre::Result<()> {
    wallet
        .encrypt_all(passphrase.expose_secret(), kdf)
        .await
        .wrap_err("failed to seal wallet")?;
    let json = wallet.to_json()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .wrap_err_with(|| format!("failed to create {}", parent.display()))?;
    }
    let tmp = temp_path(path);
    fs::write(&tmp, json).wrap_err_with(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .wrap_err_with(|| format!("failed to replace {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wallet written");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
