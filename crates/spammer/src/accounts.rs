//! Account records.
//!
//! An [`Account`] is a keypair plus its ledger-relative state: balance,
//! network-assigned account number, and the monotonic sequence counter the
//! network uses to order and deduplicate transactions. Accounts are owned
//! exclusively by whichever task popped them from the pool, so none of the
//! fields need locking.

use crate::error::SpamError;
use std::fmt;
use txflood_client::{AccountState, LedgerClient};
use txflood_types::{Address, Coin, KeyPair, SignDoc, SignedTransaction, StdFee, TransferMessage};

/// Fixed memo attached to every transaction this tool signs.
pub const MEMO: &str = "txflood";

/// A funded account that can sign transactions.
pub struct Account {
    /// Network identifier, immutable after creation.
    pub chain_id: String,

    /// Signing keypair. Exclusively owned, never persisted.
    pub keypair: KeyPair,

    /// Current balance in the fee denomination.
    pub coin: Coin,

    /// Network-assigned identifier, set on first query.
    pub account_number: u64,

    /// Count of transactions the network has accepted from this account.
    /// Incremented by exactly one after every confirmed broadcast.
    pub sequence: u64,

    /// Precomputed child keypair reserved for the next derivation split.
    pub next_keypair: KeyPair,

    /// Fixed destination used by the load generator.
    pub receiver: Address,

    /// Gas limit per message.
    pub gas_limit: u64,

    /// Fee paid per transaction.
    pub fee: Coin,

    /// Load-generator quota; the account is retired when it reaches zero.
    pub remaining_sends: u64,
}

impl Account {
    /// Open an account from an operator-supplied keypair, querying the
    /// network for chain id and current state.
    ///
    /// Fails if the account holds none of the fee denomination.
    pub async fn open<C: LedgerClient>(
        client: &C,
        keypair: KeyPair,
        fee: Coin,
        gas_limit: u64,
        receiver: Option<Address>,
    ) -> Result<Self, SpamError> {
        let chain_id = client.chain_id().await.map_err(SpamError::Query)?;
        let state = client
            .query_account(&keypair.address())
            .await
            .map_err(SpamError::Query)?;

        let balance = state.balance_of(&fee.denom);
        if balance == 0 {
            return Err(SpamError::InsufficientFunds {
                denom: fee.denom.clone(),
                required: 1,
                available: 0,
            });
        }

        let receiver = receiver.unwrap_or_else(|| keypair.address());
        Ok(Self {
            chain_id,
            coin: Coin::new(fee.denom.clone(), balance),
            account_number: state.account_number,
            sequence: state.sequence,
            next_keypair: KeyPair::generate(),
            receiver,
            gas_limit,
            fee,
            keypair,
            remaining_sends: 0,
        })
    }

    /// The account's address.
    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    /// Pre-flight capacity check: the run needs strictly more than
    /// `(fee + 1) * repeat` per account across all `accounts` descendants.
    ///
    /// The per-account cost mirrors the load generator's reservation: each
    /// of `repeat` sends moves one unit and pays one fee.
    pub fn ensure_can_fund(&self, accounts: usize, repeat: u64) -> Result<(), SpamError> {
        let per_account = self.fee.amount.saturating_add(1);
        let required = per_account
            .checked_mul(repeat as u128)
            .and_then(|x| x.checked_mul(accounts as u128))
            .unwrap_or(u128::MAX);

        if self.coin.amount <= required {
            return Err(SpamError::InsufficientFunds {
                denom: self.coin.denom.clone(),
                required,
                available: self.coin.amount,
            });
        }
        Ok(())
    }

    /// Build and sign a transfer transaction at the current sequence.
    ///
    /// Gas scales with the number of messages, as the fee schedule charges
    /// per message.
    pub fn sign_transfer(
        &self,
        msgs: Vec<TransferMessage>,
    ) -> Result<SignedTransaction, SpamError> {
        let gas = self.gas_limit.saturating_mul(msgs.len() as u64);
        let doc = SignDoc {
            chain_id: self.chain_id.clone(),
            account_number: self.account_number,
            sequence: self.sequence,
            fee: StdFee::new(gas, self.fee.clone()),
            msgs,
            memo: MEMO.to_string(),
        };
        Ok(doc.sign(&self.keypair)?)
    }

    /// Debit `amount` from the balance, failing on underflow.
    ///
    /// Underflow means the engine's bookkeeping diverged from the ledger
    /// and the run must stop.
    pub fn debit(&mut self, amount: u128) -> Result<(), SpamError> {
        match self.coin.checked_sub(amount) {
            Some(coin) => {
                self.coin = coin;
                Ok(())
            }
            None => Err(SpamError::BalanceUnderflow {
                address: self.address().to_string(),
                denom: self.coin.denom.clone(),
                amount,
                available: self.coin.amount,
            }),
        }
    }

    /// Materialize the child account created by a split, from the child's
    /// freshly queried on-ledger state.
    ///
    /// The child inherits everything positional from the parent: chain id,
    /// receiver, fee, gas, and the send quota.
    pub fn spawn_child(&self, keypair: KeyPair, state: &AccountState) -> Account {
        Account {
            chain_id: self.chain_id.clone(),
            coin: Coin::new(self.coin.denom.clone(), state.balance_of(&self.coin.denom)),
            account_number: state.account_number,
            sequence: state.sequence,
            next_keypair: KeyPair::generate(),
            receiver: self.receiver,
            gas_limit: self.gas_limit,
            fee: self.fee.clone(),
            keypair,
            remaining_sends: self.remaining_sends,
        }
    }

    /// Apply the parent-side bookkeeping of a confirmed split: half the
    /// balance left, minus exactly one fee; sequence advanced; a fresh
    /// child key reserved for the next split.
    pub fn confirm_split(&mut self) -> Result<(), SpamError> {
        let half = self.coin.div_floor(2);
        let remaining = half
            .checked_sub(self.fee.amount)
            .ok_or_else(|| SpamError::BalanceUnderflow {
                address: self.address().to_string(),
                denom: self.coin.denom.clone(),
                amount: self.fee.amount,
                available: half,
            })?;
        self.coin = Coin::new(self.coin.denom.clone(), remaining);
        self.sequence += 1;
        self.next_keypair = KeyPair::generate();
        Ok(())
    }
}

impl fmt::Display for Account {
    /// Human-readable summary. Secret material is intentionally omitted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "account {} number={} sequence={} balance={} sends_left={}",
            self.address(),
            self.account_number,
            self.sequence,
            self.coin,
            self.remaining_sends
        )
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
