//! Signing capability consumed by the transaction assembler
//!
//! The assembler never touches key material. It hands the signable
//! document to a `Signer` and receives the signature and the public key
//! that produced it. `crate::wallet::Wallet` is the mnemonic-backed
//! implementation; tests plug in deterministic stubs.

use anyhow::Result;

use crate::tx::SignableDocument;

/// Raw signing output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerOutput {
    /// 64-byte compact secp256k1 signature
    pub signature: Vec<u8>,
    /// 33-byte compressed public key
    pub public_key: Vec<u8>,
}

/// Account key able to authorize transactions
pub trait Signer: Send + Sync {
    /// Bech32 address stamped into messages as `signer`
    fn address(&self) -> &str;

    /// Sign the canonical form of a document
    fn sign(&self, document: &SignableDocument) -> Result<SignerOutput>;
}

impl<S: Signer + ?Sized> Signer for &S {
    fn address(&self) -> &str {
        (**self).address()
    }

    fn sign(&self, document: &SignableDocument) -> Result<SignerOutput> {
        (**self).sign(document)
    }
}
