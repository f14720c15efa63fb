//! In-memory ledger used by the integration tests.
//!
//! The mock enforces the same rules a real node would: signatures must
//! verify, sequences must match exactly, and balances must cover the
//! transfer plus the fee. A failure-injection knob rejects every broadcast
//! after the first `n`.

// Not every test binary uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use txflood_client::{AccountState, BroadcastResult, ClientError, LedgerClient};
use txflood_types::{Address, Coin, SignedTransaction};

pub const CHAIN_ID: &str = "txflood-test";
pub const DENOM: &str = "stake";

#[derive(Debug, Default, Clone)]
pub struct MockAccount {
    pub account_number: u64,
    pub sequence: u64,
    pub balance: u128,
    /// Sequence number of every transaction accepted from this account,
    /// in acceptance order.
    pub history: Vec<u64>,
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<Address, MockAccount>,
    next_number: u64,
    broadcasts: u64,
    fail_after: Option<u64>,
}

/// A deterministic single-process stand-in for a ledger node.
#[derive(Debug, Default)]
pub struct MockLedger {
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `address`, creating the account if needed.
    pub fn fund(&self, address: Address, amount: u128) {
        let mut state = self.state.lock().unwrap();
        credit(&mut state, address, amount);
    }

    /// Reject every broadcast after the first `n` have been accepted.
    pub fn fail_after(&self, n: u64) {
        self.state.lock().unwrap().fail_after = Some(n);
    }

    pub fn balance_of(&self, address: &Address) -> u128 {
        self.state
            .lock()
            .unwrap()
            .accounts
            .get(address)
            .map(|a| a.balance)
            .unwrap_or(0)
    }

    pub fn sequence_of(&self, address: &Address) -> u64 {
        self.state
            .lock()
            .unwrap()
            .accounts
            .get(address)
            .map(|a| a.sequence)
            .unwrap_or(0)
    }

    pub fn history_of(&self, address: &Address) -> Vec<u64> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .get(address)
            .map(|a| a.history.clone())
            .unwrap_or_default()
    }

    /// Total broadcasts received, accepted or not.
    pub fn broadcast_count(&self) -> u64 {
        self.state.lock().unwrap().broadcasts
    }

    pub fn account_count(&self) -> usize {
        self.state.lock().unwrap().accounts.len()
    }

    /// Sum of every balance on the ledger.
    pub fn total_supply(&self) -> u128 {
        self.state
            .lock()
            .unwrap()
            .accounts
            .values()
            .map(|a| a.balance)
            .sum()
    }
}

fn credit(state: &mut LedgerState, address: Address, amount: u128) {
    let next_number = &mut state.next_number;
    let account = state.accounts.entry(address).or_insert_with(|| {
        *next_number += 1;
        MockAccount {
            account_number: *next_number,
            ..MockAccount::default()
        }
    });
    account.balance += amount;
}

fn rejected(log: impl Into<String>) -> ClientError {
    ClientError::Rejected {
        code: 1,
        log: log.into(),
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn query_account(&self, address: &Address) -> Result<AccountState, ClientError> {
        let state = self.state.lock().unwrap();
        let account = state
            .accounts
            .get(address)
            .ok_or_else(|| ClientError::NotFound {
                address: address.to_string(),
            })?;
        Ok(AccountState {
            account_number: account.account_number,
            sequence: account.sequence,
            balances: vec![Coin::new(DENOM, account.balance)],
        })
    }

    async fn chain_id(&self) -> Result<String, ClientError> {
        Ok(CHAIN_ID.to_string())
    }

    async fn broadcast_commit(&self, tx: &SignedTransaction) -> Result<BroadcastResult, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.broadcasts += 1;
        if let Some(limit) = state.fail_after {
            if state.broadcasts > limit {
                return Err(rejected("injected failure"));
            }
        }

        if !tx.verify() {
            return Err(rejected("signature verification failed"));
        }
        if tx.doc.chain_id != CHAIN_ID {
            return Err(rejected(format!("wrong chain id {}", tx.doc.chain_id)));
        }

        let signer = tx.signer();
        let sender = state
            .accounts
            .get(&signer)
            .ok_or_else(|| rejected(format!("unknown sender {signer}")))?
            .clone();

        if tx.doc.sequence != sender.sequence {
            return Err(rejected(format!(
                "sequence mismatch: got {}, expected {}",
                tx.doc.sequence, sender.sequence
            )));
        }
        if tx.doc.account_number != sender.account_number {
            return Err(rejected("account number mismatch"));
        }

        let mut total = tx.doc.fee.amount.amount;
        for msg in &tx.doc.msgs {
            if msg.from != signer {
                return Err(rejected("message sender does not match signer"));
            }
            if msg.amount.denom != DENOM {
                return Err(rejected(format!("unknown denom {}", msg.amount.denom)));
            }
            total += msg.amount.amount;
        }
        if sender.balance < total {
            return Err(rejected(format!(
                "insufficient funds: have {}, need {total}",
                sender.balance
            )));
        }

        let accepted_sequence = sender.sequence;
        {
            let sender = state.accounts.get_mut(&signer).unwrap();
            sender.balance -= total;
            sender.sequence += 1;
            sender.history.push(accepted_sequence);
        }
        for msg in &tx.doc.msgs {
            credit(&mut state, msg.to, msg.amount.amount);
        }

        Ok(BroadcastResult {
            tx_hash: format!("{:016x}", state.broadcasts),
        })
    }
}

/// Open an account against the mock after funding it. When `receiver` is
/// `None` the account sends to itself.
pub async fn open_funded(
    ledger: &MockLedger,
    seed: &[u8; 32],
    balance: u128,
    fee: u128,
    receiver: Option<Address>,
) -> txflood_spammer::Account {
    let keypair = txflood_types::KeyPair::from_seed(seed);
    ledger.fund(keypair.address(), balance);
    txflood_spammer::Account::open(ledger, keypair, Coin::new(DENOM, fee), 100_000, receiver)
        .await
        .expect("open funded account")
}

/// A funded sink address unrelated to any account under test.
pub fn sink_address(ledger: &MockLedger) -> Address {
    let address = txflood_types::KeyPair::from_seed(&[0xEE; 32]).address();
    ledger.fund(address, 1);
    address
}
