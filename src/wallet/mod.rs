//! Mnemonic-backed secp256k1 wallet
//!
//! This module provides:
//! - BIP39 mnemonic validation and seed generation
//! - BIP32 key derivation along the cosmos path (`m/44'/118'/0'/0/0`)
//! - Bech32 account addresses with a configurable prefix
//! - Signing of transaction documents over their canonical JSON

use anyhow::{anyhow, Context, Result};
use bip39::Mnemonic;
use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::Network;
use log::{debug, info};
use secp256k1::ecdsa::Signature;
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use std::str::FromStr;

use crate::address::{address_from_public_key, DEFAULT_ADDRESS_PREFIX};
use crate::signer::{Signer, SignerOutput};
use crate::tx::SignableDocument;

/// Default cosmos derivation path
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/118'/0'/0/0";

/// Wallet holding a single derived account key
pub struct Wallet {
    /// Bech32 account address
    address: String,
    /// Compressed public key
    public_key: PublicKey,
    /// Derived private key
    secret_key: SecretKey,
    /// Secp256k1 context
    secp: Secp256k1<All>,
}

impl Wallet {
    /// Create a wallet from a mnemonic, using the default path and address prefix
    pub fn from_mnemonic(mnemonic: &str) -> Result<Self> {
        Self::from_mnemonic_with_path(mnemonic, DEFAULT_DERIVATION_PATH, DEFAULT_ADDRESS_PREFIX)
    }

    /// Create a wallet from a mnemonic along a custom derivation path
    pub fn from_mnemonic_with_path(mnemonic: &str, path: &str, prefix: &str) -> Result<Self> {
        let mnemonic = Mnemonic::parse_normalized(mnemonic).context("Invalid mnemonic phrase")?;
        let seed = mnemonic.to_seed("");

        let secp = Secp256k1::new();
        let path = DerivationPath::from_str(path).context("Invalid derivation path")?;
        let master_key = Xpriv::new_master(Network::Bitcoin, &seed)
            .context("Failed to create master key from seed")?;
        let derived = master_key
            .derive_priv(&secp, &path)
            .context("Failed to derive account key")?;

        let wallet = Self::from_secret_key(derived.private_key, prefix)?;
        info!("Loaded wallet {} (path {})", wallet.address, path);
        Ok(wallet)
    }

    /// Create a wallet from a hex-encoded private key
    pub fn from_private_key_hex(private_key: &str, prefix: &str) -> Result<Self> {
        let secret_key = SecretKey::from_str(private_key).context("Invalid private key")?;
        Self::from_secret_key(secret_key, prefix)
    }

    fn from_secret_key(secret_key: SecretKey, prefix: &str) -> Result<Self> {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        let address = address_from_public_key(prefix, &public_key.serialize())
            .map_err(|e| anyhow!("Failed to encode address: {}", e))?;

        Ok(Self {
            address,
            public_key,
            secret_key,
            secp,
        })
    }

    /// Compressed public key bytes
    pub fn public_key(&self) -> [u8; 33] {
        self.public_key.serialize()
    }

    /// Sign arbitrary bytes: sha256, then compact ECDSA
    pub fn sign_bytes(&self, bytes: &[u8]) -> [u8; 64] {
        let digest: [u8; 32] = Sha256::digest(bytes).into();
        let message = Message::from_digest(digest);
        self.secp
            .sign_ecdsa(&message, &self.secret_key)
            .serialize_compact()
    }

    /// Verify a compact signature over `bytes` against a compressed public key
    pub fn verify(bytes: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool> {
        let public_key = PublicKey::from_slice(public_key).context("Invalid public key")?;
        let signature = Signature::from_compact(signature).context("Invalid compact signature")?;
        let digest: [u8; 32] = Sha256::digest(bytes).into();
        let message = Message::from_digest(digest);

        let secp = Secp256k1::verification_only();
        Ok(secp.verify_ecdsa(&message, &signature, &public_key).is_ok())
    }
}

impl Signer for Wallet {
    fn address(&self) -> &str {
        &self.address
    }

    fn sign(&self, document: &SignableDocument) -> Result<SignerOutput> {
        let bytes = document
            .canonical_bytes()
            .context("Failed to serialize document for signing")?;
        debug!("Signing {} byte document for {}", bytes.len(), self.address);

        Ok(SignerOutput {
            signature: self.sign_bytes(&bytes).to_vec(),
            public_key: self.public_key().to_vec(),
        })
    }
}
