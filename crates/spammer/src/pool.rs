//! The shared account pool.
//!
//! A bounded mpsc channel doubles as work queue and ownership mechanism:
//! popping an [`Account`] moves it out of the channel, granting the popping
//! task sole ownership until it is pushed back (or dropped on retirement).
//! Per-account sequence correctness falls out of this discipline — no task
//! ever holds an account another task can touch.
//!
//! The channel does not expose its occupancy, so the pool tracks it with an
//! external atomic counter shared between the pool and its push handles.

use crate::accounts::Account;
use crate::error::SpamError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// FIFO pool of accounts with exclusive ownership on dequeue.
///
/// The pool itself is the single consumer; producers push through cheap
/// cloneable [`PoolHandle`]s.
#[derive(Debug)]
pub struct AccountPool {
    tx: mpsc::Sender<Account>,
    rx: mpsc::Receiver<Account>,
    len: Arc<AtomicUsize>,
}

/// Cloneable producer side of an [`AccountPool`].
#[derive(Debug, Clone)]
pub struct PoolHandle {
    tx: mpsc::Sender<Account>,
    len: Arc<AtomicUsize>,
}

impl AccountPool {
    /// Create an empty pool holding at most `capacity` accounts.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx,
            len: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Build a pool pre-filled with `accounts`.
    pub fn from_accounts(accounts: Vec<Account>) -> Self {
        let mut pool = Self::with_capacity(accounts.len());
        for account in accounts {
            // Capacity matches the vec length, so try_send cannot fail.
            if pool.tx.try_send(account).is_ok() {
                pool.len.fetch_add(1, Ordering::SeqCst);
            }
        }
        pool
    }

    /// A producer handle for pushing accounts back.
    pub fn handle(&self) -> PoolHandle {
        PoolHandle {
            tx: self.tx.clone(),
            len: Arc::clone(&self.len),
        }
    }

    /// Pop the next account, waiting until one is available.
    ///
    /// Returns `None` only if every producer handle has been dropped and
    /// the pool is empty.
    pub async fn pop(&mut self) -> Option<Account> {
        let account = self.rx.recv().await?;
        self.len.fetch_sub(1, Ordering::SeqCst);
        Some(account)
    }

    /// Pop without waiting.
    pub fn try_pop(&mut self) -> Option<Account> {
        let account = self.rx.try_recv().ok()?;
        self.len.fetch_sub(1, Ordering::SeqCst);
        Some(account)
    }

    /// Number of accounts currently queued (racy under concurrent pushes,
    /// exact when the pool is quiescent).
    pub fn len(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain every queued account out of the pool.
    pub fn into_accounts(mut self) -> Vec<Account> {
        let mut accounts = Vec::with_capacity(self.len());
        while let Some(account) = self.try_pop() {
            accounts.push(account);
        }
        accounts
    }
}

impl PoolHandle {
    /// Push an account into the pool, waiting for a slot if full.
    pub async fn push(&self, account: Account) -> Result<(), SpamError> {
        self.len.fetch_add(1, Ordering::SeqCst);
        match self.tx.send(account).await {
            Ok(()) => Ok(()),
            Err(_) => {
                self.len.fetch_sub(1, Ordering::SeqCst);
                Err(SpamError::PoolClosed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txflood_types::{Coin, KeyPair};

    fn test_account(seed: u8) -> Account {
        let key = KeyPair::from_seed(&[seed; 32]);
        let receiver = key.address();
        Account {
            chain_id: "txflood-test".to_string(),
            coin: Coin::new("stake", 1_000),
            account_number: seed as u64,
            sequence: 0,
            next_keypair: KeyPair::generate(),
            receiver,
            gas_limit: 100_000,
            fee: Coin::new("stake", 10),
            keypair: key,
            remaining_sends: 0,
        }
    }

    #[tokio::test]
    async fn test_push_pop_fifo() {
        let mut pool = AccountPool::with_capacity(2);
        let handle = pool.handle();

        handle.push(test_account(1)).await.unwrap();
        handle.push(test_account(2)).await.unwrap();
        assert_eq!(pool.len(), 2);

        assert_eq!(pool.pop().await.unwrap().account_number, 1);
        assert_eq!(pool.pop().await.unwrap().account_number, 2);
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_from_accounts_preserves_order() {
        let pool = AccountPool::from_accounts(vec![
            test_account(1),
            test_account(2),
            test_account(3),
        ]);
        assert_eq!(pool.len(), 3);

        let numbers: Vec<u64> = pool
            .into_accounts()
            .iter()
            .map(|a| a.account_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_try_pop_empty() {
        let mut pool = AccountPool::with_capacity(1);
        assert!(pool.try_pop().is_none());
    }

    #[tokio::test]
    async fn test_push_back_after_pop() {
        let mut pool = AccountPool::from_accounts(vec![test_account(1)]);
        let handle = pool.handle();

        let account = pool.pop().await.unwrap();
        assert!(pool.is_empty());

        handle.push(account).await.unwrap();
        assert_eq!(pool.len(), 1);
    }
}
