// ABOUTME: Transaction signer built from raw secp256k1 private key material
// ABOUTME: Exposes the signing account and signs direct-mode sign docs

use anyhow::{anyhow, bail, Context, Result};
use cosmrs::crypto::secp256k1::SigningKey;
use cosmrs::crypto::PublicKey;
use cosmrs::tx::{self, SignDoc};
use cosmrs::AccountId;
use std::fmt;
use zeroize::Zeroizing;

/// Account exposed by a signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountData {
    pub address: String,
}

/// Holds one private key and signs on behalf of its account
///
/// The key bytes live in a zeroizing buffer; the `SigningKey` itself is only
/// materialised for the duration of a single signature.
pub struct Signer {
    private_key: Zeroizing<Vec<u8>>,
    public_key: PublicKey,
    address: AccountId,
}

impl Signer {
    /// Build a signer from a hex-encoded 32 byte secp256k1 private key
    pub fn from_private_key_hex(private_key_hex: &str, prefix: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            hex::decode(private_key_hex.trim()).context("Private key is not valid hex")?,
        );
        if bytes.len() != 32 {
            bail!(
                "Private key must be 32 bytes long, got {} bytes",
                bytes.len()
            );
        }

        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| anyhow!("Invalid secp256k1 private key: {}", e))?;
        let public_key = signing_key.public_key();
        let address = public_key
            .account_id(prefix)
            .map_err(|e| anyhow!("Failed to derive account address: {}", e))?;

        Ok(Self {
            private_key: bytes,
            public_key,
            address,
        })
    }

    pub fn accounts(&self) -> Vec<AccountData> {
        vec![AccountData {
            address: self.address.to_string(),
        }]
    }

    pub fn address(&self) -> &AccountId {
        &self.address
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn sign_direct(&self, sign_doc: SignDoc) -> Result<tx::Raw> {
        let signing_key = SigningKey::from_slice(&self.private_key)
            .map_err(|e| anyhow!("Invalid secp256k1 private key: {}", e))?;
        sign_doc
            .sign(&signing_key)
            .map_err(|e| anyhow!("Failed to sign raw transaction: {}", e))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address.to_string())
            .finish_non_exhaustive()
    }
}
