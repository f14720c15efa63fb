//! Load generator: drives a pool of funded accounts through a sustained,
//! concurrency-bounded stream of transfer transactions.
//!
//! Each dequeued account is exclusively owned by its task for exactly one
//! broadcast-and-confirm round trip, which is what keeps per-account
//! sequence numbering correct without any per-account lock.

use crate::accounts::Account;
use crate::error::SpamError;
use crate::pool::{AccountPool, PoolHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use txflood_client::LedgerClient;
use txflood_types::{Coin, TransferMessage};

/// The transfer amount for one send.
///
/// The first processed send (quota untouched) moves everything above the
/// reservation needed for the remaining sends: `(fee + 1)` per send, so the
/// account lands on a balance of exactly one unit after its final send.
/// Every later send moves the fixed minimal unit.
///
/// The formula assumes a unit transfer size of exactly 1 and a fee that
/// never changes mid-run. Returns `None` when the balance cannot cover the
/// reservation.
fn transfer_amount(balance: u128, fee: u128, remaining: u64, repeat: u64) -> Option<u128> {
    if remaining == repeat {
        let reserve = fee.checked_add(1)?.checked_mul(repeat as u128)?;
        balance.checked_sub(reserve)
    } else {
        Some(1)
    }
}

/// Counters shared across send tasks.
#[derive(Debug, Default)]
pub struct SpamStats {
    /// Transactions handed to the client for broadcast.
    pub submitted: AtomicU64,
    /// Transactions confirmed committed.
    pub confirmed: AtomicU64,
    /// Accounts whose quota reached zero.
    pub retired: AtomicU64,
}

impl SpamStats {
    /// Confirmed transactions per second since `start`.
    pub fn tps(&self, start: Instant) -> f64 {
        let elapsed = start.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.confirmed.load(Ordering::SeqCst) as f64 / elapsed
        } else {
            0.0
        }
    }
}

/// Report produced after a load-generation run.
#[derive(Debug)]
pub struct SpamReport {
    pub duration: Duration,
    pub total_submitted: u64,
    pub total_confirmed: u64,
    pub accounts_retired: u64,
    pub avg_tps: f64,
}

impl SpamReport {
    /// Log the report.
    pub fn log(&self) {
        info!(
            duration_ms = self.duration.as_millis() as u64,
            submitted = self.total_submitted,
            confirmed = self.total_confirmed,
            retired = self.accounts_retired,
            avg_tps = format!("{:.2}", self.avg_tps),
            "load generation finished"
        );
    }
}

/// Drives transfer transactions from a pool of accounts until every
/// account's quota is exhausted.
pub struct LoadGenerator<C> {
    client: Arc<C>,
    stats: Arc<SpamStats>,
}

impl<C: LedgerClient + 'static> LoadGenerator<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            stats: Arc::new(SpamStats::default()),
        }
    }

    /// Shared counters, readable while a run is in progress.
    pub fn stats(&self) -> Arc<SpamStats> {
        Arc::clone(&self.stats)
    }

    /// Consume `pool`, issuing up to `accounts * repeat` transactions.
    ///
    /// Every account in the pool must still carry its full quota of
    /// `repeat` sends; `remaining_sends` is stamped here. Returns once
    /// every send task has finished, or the first error after a broadcast
    /// failure cancelled the run.
    pub async fn run(&self, pool: AccountPool, repeat: u64) -> Result<SpamReport, SpamError> {
        let mut accounts = pool.into_accounts();
        for account in &mut accounts {
            account.remaining_sends = repeat;
        }
        self.run_prepared(AccountPool::from_accounts(accounts), repeat)
            .await
    }

    /// Like [`run`](Self::run), but the accounts' `remaining_sends` are
    /// taken as-is (used for resumed pools).
    pub async fn run_prepared(
        &self,
        pool: AccountPool,
        repeat: u64,
    ) -> Result<SpamReport, SpamError> {
        let start = Instant::now();

        // Accounts with no quota left are already retired; queueing them
        // would desynchronize the iteration count from the push/pop balance.
        let mut accounts = pool.into_accounts();
        accounts.retain(|account| account.remaining_sends > 0);

        let account_count = accounts.len();
        let iterations: u64 = accounts.iter().map(|a| a.remaining_sends).sum();
        let mut pool = AccountPool::from_accounts(accounts);

        if account_count == 0 {
            return Ok(self.report(start));
        }

        info!(accounts = account_count, repeat, "starting load generation");

        // One permit per account: a task owns exactly one account, so more
        // permits than accounts would never be used.
        let semaphore = Arc::new(Semaphore::new(account_count));
        let cancel = CancellationToken::new();
        let mut sends: JoinSet<Result<(), SpamError>> = JoinSet::new();
        let handle = pool.handle();

        for _ in 0..iterations {
            let account = tokio::select! {
                _ = cancel.cancelled() => break,
                account = pool.pop() => match account {
                    Some(account) => account,
                    None => break,
                },
            };

            // Same cancellation race as the derivation dispatch loop: a
            // failure elsewhere must not let a queued send go out.
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let client = Arc::clone(&self.client);
            let handle = handle.clone();
            let stats = Arc::clone(&self.stats);
            let cancel = cancel.clone();
            sends.spawn(async move {
                let _permit = permit;
                if cancel.is_cancelled() {
                    return Ok(());
                }
                match send_one(client.as_ref(), account, &handle, &stats, repeat).await {
                    Ok(()) => Ok(()),
                    Err(err) => {
                        error!(error = %err, "send failed, cancelling run");
                        cancel.cancel();
                        Err(err)
                    }
                }
            });
        }

        // Completion barrier: block until zero outstanding send tasks.
        let mut first_err = None;
        while let Some(joined) = sends.join_next().await {
            let result = joined.unwrap_or_else(|err| Err(SpamError::Task(err.to_string())));
            if let Err(err) = result {
                first_err.get_or_insert(err);
            }
        }
        if let Some(err) = first_err {
            return Err(err);
        }

        let report = self.report(start);
        report.log();
        Ok(report)
    }

    fn report(&self, start: Instant) -> SpamReport {
        SpamReport {
            duration: start.elapsed(),
            total_submitted: self.stats.submitted.load(Ordering::SeqCst),
            total_confirmed: self.stats.confirmed.load(Ordering::SeqCst),
            accounts_retired: self.stats.retired.load(Ordering::SeqCst),
            avg_tps: self.stats.tps(start),
        }
    }
}

/// One send: build the transfer, broadcast-and-confirm, update the account,
/// then requeue or retire it.
async fn send_one<C: LedgerClient>(
    client: &C,
    mut account: Account,
    pool: &PoolHandle,
    stats: &SpamStats,
    repeat: u64,
) -> Result<(), SpamError> {
    if account.remaining_sends == 0 {
        return Ok(());
    }

    let amount = transfer_amount(
        account.coin.amount,
        account.fee.amount,
        account.remaining_sends,
        repeat,
    )
    .ok_or_else(|| SpamError::BalanceUnderflow {
        address: account.address().to_string(),
        denom: account.coin.denom.clone(),
        amount: (account.fee.amount + 1).saturating_mul(repeat as u128),
        available: account.coin.amount,
    })?;

    account.remaining_sends -= 1;

    let msg = TransferMessage {
        from: account.address(),
        to: account.receiver,
        amount: Coin::new(account.coin.denom.clone(), amount),
    };
    let tx = account.sign_transfer(vec![msg])?;

    stats.submitted.fetch_add(1, Ordering::SeqCst);
    client
        .broadcast_commit(&tx)
        .await
        .map_err(SpamError::Broadcast)?;

    account.sequence += 1;
    account.debit(amount + account.fee.amount)?;
    stats.confirmed.fetch_add(1, Ordering::SeqCst);

    if account.remaining_sends > 0 {
        pool.push(account).await?;
    } else {
        stats.retired.fetch_add(1, Ordering::SeqCst);
        debug!(account = %account.address(), balance = account.coin.amount, "account retired");
    }
    Ok(())
}
