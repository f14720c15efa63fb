//! Transfer messages and signed transactions.
//!
//! A transaction is a [`SignDoc`] (chain id, account number, sequence, fee,
//! messages, memo) plus exactly one signature over the document's canonical
//! encoding. The canonical encoding is the JSON serialization with the field
//! order fixed by the struct definitions below.

use crate::coin::Coin;
use crate::crypto::{Address, KeyPair, PublicKey, Signature};
use serde::{Deserialize, Serialize};

/// A single funds transfer inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMessage {
    pub from: Address,
    pub to: Address,
    pub amount: Coin,
}

/// Per-transaction cost parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Coin,
    pub gas_limit: u64,
}

impl StdFee {
    pub fn new(gas_limit: u64, amount: Coin) -> Self {
        Self { amount, gas_limit }
    }
}

/// The document that gets signed: everything the network needs to order and
/// deduplicate the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignDoc {
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
    pub fee: StdFee,
    pub msgs: Vec<TransferMessage>,
    pub memo: String,
}

impl SignDoc {
    /// Canonical byte encoding used for signing and verification.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Sign the document with `keypair`, producing a complete transaction.
    pub fn sign(self, keypair: &KeyPair) -> Result<SignedTransaction, serde_json::Error> {
        let bytes = self.canonical_bytes()?;
        let signature = TxSignature {
            public_key: keypair.public_key(),
            signature: keypair.sign(&bytes),
        };
        Ok(SignedTransaction {
            doc: self,
            signature,
        })
    }
}

/// The single signature carried by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSignature {
    pub public_key: PublicKey,
    pub signature: Signature,
}

/// A signed, broadcast-ready transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub doc: SignDoc,
    pub signature: TxSignature,
}

impl SignedTransaction {
    /// Verify the signature against the canonical encoding of the document.
    pub fn verify(&self) -> bool {
        match self.doc.canonical_bytes() {
            Ok(bytes) => self
                .signature
                .public_key
                .verify(&bytes, &self.signature.signature),
            Err(_) => false,
        }
    }

    /// The address the transaction was signed by.
    pub fn signer(&self) -> Address {
        Address(self.signature.public_key.0)
    }
}
