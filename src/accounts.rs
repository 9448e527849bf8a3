// ABOUTME: Derives the OLD and NEW ShareLedger accounts from one mnemonic
// ABOUTME: Validates BIP-39 phrases and exposes address plus private key material

use crate::config::NetworkConfig;
use anyhow::{anyhow, Context, Result};
use bip39::{Language, Mnemonic};
use cosmrs::bip32::{DerivationPath, XPrv};
use cosmrs::crypto::secp256k1::SigningKey;
use std::fmt;
use zeroize::Zeroizing;

/// Message shown when the entered phrase fails wordlist or checksum checks
pub const INVALID_MNEMONIC_MESSAGE: &str =
    "The entered passphrase is invalid. Please check carefully.";

/// Address and key material for one derivation scheme
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub address: String,
    pub private_key_hex: Zeroizing<String>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// The two accounts a single mnemonic maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAccounts {
    pub old: Account,
    pub new: Account,
}

/// Parse and validate an English BIP-39 phrase
///
/// Surrounding whitespace, repeated spaces and upper case letters are
/// tolerated; the words themselves and the checksum must be valid.
///
/// ```
/// # use shareledger_migrator::accounts::validate_mnemonic;
/// let phrase = "abandon abandon abandon abandon abandon abandon \
///               abandon abandon abandon abandon abandon about";
/// assert!(validate_mnemonic(phrase).is_ok());
/// assert!(validate_mnemonic("abandon abandon abandon").is_err());
/// ```
pub fn validate_mnemonic(input: &str) -> Result<Mnemonic> {
    let normalized = input
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map_err(|e| anyhow!("{} ({})", INVALID_MNEMONIC_MESSAGE, e))
}

/// Derive one account from the BIP-39 seed along `hd_path`
fn derive_account(seed: &[u8], hd_path: &str, prefix: &str) -> Result<Account> {
    let path: DerivationPath = hd_path
        .parse()
        .map_err(|e| anyhow!("Invalid derivation path '{}': {}", hd_path, e))?;

    let extended_key = XPrv::derive_from_path(seed, &path)
        .map_err(|e| anyhow!("Key derivation along '{}' failed: {}", hd_path, e))?;
    let key_bytes = Zeroizing::new(extended_key.private_key().to_bytes().to_vec());

    let signing_key = SigningKey::from_slice(&key_bytes)
        .map_err(|e| anyhow!("Derived key is not a valid secp256k1 key: {}", e))?;
    let address = signing_key
        .public_key()
        .account_id(prefix)
        .map_err(|e| anyhow!("Failed to derive account address: {}", e))?;

    Ok(Account {
        address: address.to_string(),
        private_key_hex: Zeroizing::new(hex::encode(&*key_bytes)),
    })
}

/// Derive the OLD-format and NEW-format accounts for `mnemonic`
///
/// Both come from the same seed; only the HD path differs. The result is a
/// pure function of the mnemonic and the configured paths.
pub fn derive_accounts(mnemonic: &Mnemonic, config: &NetworkConfig) -> Result<DerivedAccounts> {
    let seed = Zeroizing::new(mnemonic.to_seed_normalized(""));

    let old = derive_account(&*seed, &config.old_derivation_path, &config.address_prefix)
        .context("Failed to derive OLD address")?;
    let new = derive_account(&*seed, &config.new_derivation_path, &config.address_prefix)
        .context("Failed to derive NEW address")?;

    tracing::debug!("Derived OLD address {} and NEW address {}", old.address, new.address);
    Ok(DerivedAccounts { old, new })
}
