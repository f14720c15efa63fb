//! txflood: fan one funded ledger account out into many, then flood the
//! network with transfer transactions.
//!
//! # Modules
//!
//! - [`accounts`]: The account record (keypair + ledger-relative state)
//! - [`pool`]: Concurrency-safe account queue with exclusive ownership on dequeue
//! - [`derive`]: Derivation engine (binary fan-out of signed splits)
//! - [`runner`]: Load generator (bounded-concurrency transaction stream)
//! - [`snapshot`]: Flat-file persistence of the pool (secrets excluded)
//! - [`config`]: Run configuration
//! - [`error`]: Engine error taxonomy

pub mod accounts;
pub mod config;
pub mod derive;
pub mod error;
pub mod pool;
pub mod runner;
pub mod snapshot;

pub use accounts::Account;
pub use config::{ConfigError, SpamConfig, DEFAULT_MAX_IN_FLIGHT_SPLITS};
pub use derive::{fan_out_rounds, DerivationEngine, MAX_FAN_OUT_ROUNDS};
pub use error::SpamError;
pub use pool::{AccountPool, PoolHandle};
pub use runner::{LoadGenerator, SpamReport, SpamStats};
pub use snapshot::{SnapshotError, SnapshotRecord};
