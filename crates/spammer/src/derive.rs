//! Account derivation: binary fan-out of one funded account into many.
//!
//! Each split is one signed transfer that moves half the parent's balance to
//! the parent's pre-reserved child key, followed by a query of the child's
//! fresh on-ledger state. Splits run concurrently under a counting semaphore;
//! a single failure cancels the whole run.

use crate::accounts::Account;
use crate::config::DEFAULT_MAX_IN_FLIGHT_SPLITS;
use crate::error::SpamError;
use crate::pool::{AccountPool, PoolHandle};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use txflood_client::LedgerClient;
use txflood_types::{Coin, TransferMessage};

/// Hard cap on fan-out rounds (2^15 = 32768 accounts).
pub const MAX_FAN_OUT_ROUNDS: u32 = 15;

/// Smallest number of doubling rounds k such that 2^k >= target.
///
/// ```text
/// rounds 0  1  2  3  4   5   ...
/// leaves 1  2  4  8  16  32  ...
/// ```
pub fn fan_out_rounds(target: usize) -> Result<u32, SpamError> {
    if target <= 1 {
        return Ok(0);
    }
    let mut leaves = 2usize;
    for rounds in 1..=MAX_FAN_OUT_ROUNDS {
        if leaves >= target {
            return Ok(rounds);
        }
        leaves *= 2;
    }
    Err(SpamError::Config(
        crate::config::ConfigError::FanOutTooLarge {
            requested: target,
            max: 1 << MAX_FAN_OUT_ROUNDS,
        },
    ))
}

/// Fans one funded account out into a pool of independently usable accounts.
pub struct DerivationEngine<C> {
    client: Arc<C>,
    max_in_flight: usize,
}

impl<C: LedgerClient + 'static> DerivationEngine<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT_SPLITS,
        }
    }

    /// Override the ceiling on concurrent in-flight splits.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Split `root` into a pool of exactly `target` funded accounts.
    ///
    /// `target - 1` split transactions are issued in total. The dispatch
    /// loop walks one slot per account of the final fan-out round; accounts
    /// past the requested count are passed through unsplit. Any broadcast or
    /// query failure cancels outstanding dispatch and the first error is
    /// returned once every in-flight split has been joined.
    pub async fn derive(&self, root: Account, target: usize) -> Result<AccountPool, SpamError> {
        let rounds = fan_out_rounds(target)?;
        let mut pool = AccountPool::with_capacity(target.max(1));
        pool.handle().push(root).await?;

        if target <= 1 {
            return Ok(pool);
        }

        info!(target, rounds, "deriving accounts");

        let leaves = 1usize << rounds;
        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let cancel = CancellationToken::new();
        let mut splits: JoinSet<Result<(), SpamError>> = JoinSet::new();
        let handle = pool.handle();

        for i in 1..(2 * leaves) {
            let account = tokio::select! {
                _ = cancel.cancelled() => break,
                account = pool.pop() => match account {
                    Some(account) => account,
                    None => break,
                },
            };

            // Beyond the requested count this round: pass through unsplit.
            if i >= target {
                handle.push(account).await?;
                continue;
            }

            // The permit wait can outlive a failure elsewhere; racing it
            // against cancellation keeps a doomed run from dispatching more.
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let client = Arc::clone(&self.client);
            let handle = handle.clone();
            let cancel = cancel.clone();
            splits.spawn(async move {
                let _permit = permit;
                if cancel.is_cancelled() {
                    return Ok(());
                }
                match split_account(client.as_ref(), account, &handle).await {
                    Ok(()) => Ok(()),
                    Err(err) => {
                        error!(error = %err, "split failed, cancelling derivation");
                        cancel.cancel();
                        Err(err)
                    }
                }
            });
        }

        // Completion barrier: every in-flight split joined, first error wins.
        let mut first_err = None;
        while let Some(joined) = splits.join_next().await {
            let result = joined.unwrap_or_else(|err| Err(SpamError::Task(err.to_string())));
            if let Err(err) = result {
                first_err.get_or_insert(err);
            }
        }
        if let Some(err) = first_err {
            return Err(err);
        }

        info!(accounts = pool.len(), "derivation complete");
        Ok(pool)
    }

    /// Flat fan-out: create `children` fresh accounts with a single
    /// multi-message transfer from `root`, each receiving
    /// `balance / children - fee`.
    ///
    /// Used to give each endpoint its own sub-root before binary derivation.
    pub async fn seed(
        &self,
        root: &mut Account,
        children: usize,
    ) -> Result<Vec<Account>, SpamError> {
        if children == 0 {
            return Ok(Vec::new());
        }

        let share = root
            .coin
            .div_floor(children as u128)
            .checked_sub(root.fee.amount)
            .ok_or_else(|| SpamError::InsufficientFunds {
                denom: root.coin.denom.clone(),
                required: root.fee.amount.saturating_mul(children as u128),
                available: root.coin.amount,
            })?;

        let keypairs: Vec<_> = (0..children).map(|_| txflood_types::KeyPair::generate()).collect();
        let msgs: Vec<TransferMessage> = keypairs
            .iter()
            .map(|key| TransferMessage {
                from: root.address(),
                to: key.address(),
                amount: Coin::new(root.coin.denom.clone(), share),
            })
            .collect();

        let tx = root.sign_transfer(msgs)?;
        self.client
            .broadcast_commit(&tx)
            .await
            .map_err(SpamError::Broadcast)?;

        root.sequence += 1;
        root.debit(share.saturating_mul(children as u128) + root.fee.amount)?;

        let mut accounts = Vec::with_capacity(children);
        for key in keypairs {
            let state = self
                .client
                .query_account(&key.address())
                .await
                .map_err(SpamError::Query)?;
            accounts.push(root.spawn_child(key, &state));
        }

        debug!(children = accounts.len(), "seeded sub-roots");
        Ok(accounts)
    }
}

/// Perform one split: broadcast the half-balance transfer, query the child,
/// then push child and updated parent back into the pool.
async fn split_account<C: LedgerClient>(
    client: &C,
    mut parent: Account,
    pool: &PoolHandle,
) -> Result<(), SpamError> {
    let half = parent.coin.div_floor(2);
    let child_key = parent.next_keypair.clone();

    let msg = TransferMessage {
        from: parent.address(),
        to: child_key.address(),
        amount: Coin::new(parent.coin.denom.clone(), half),
    };
    let tx = parent.sign_transfer(vec![msg])?;

    client
        .broadcast_commit(&tx)
        .await
        .map_err(SpamError::Broadcast)?;

    let state = client
        .query_account(&child_key.address())
        .await
        .map_err(SpamError::Query)?;

    let child = parent.spawn_child(child_key, &state);
    parent.confirm_split()?;

    debug!(
        parent = %parent.address(),
        child = %child.address(),
        amount = half,
        "split confirmed"
    );

    pool.push(child).await?;
    pool.push(parent).await?;
    Ok(())
}
