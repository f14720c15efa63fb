//! Shared value types for the txflood load-testing tool.
//!
//! # Modules
//!
//! - [`coin`]: Single-denomination integer amounts
//! - [`crypto`]: Ed25519 keypairs, addresses, signatures
//! - [`transaction`]: Transfer messages, sign documents, signed transactions

pub mod coin;
pub mod crypto;
pub mod transaction;

pub use coin::Coin;
pub use crypto::{Address, AddressParseError, KeyPair, PublicKey, Signature};
pub use transaction::{SignDoc, SignedTransaction, StdFee, TransferMessage, TxSignature};
