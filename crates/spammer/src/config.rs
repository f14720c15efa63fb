//! Run configuration.

use crate::derive::MAX_FAN_OUT_ROUNDS;
use std::path::PathBuf;
use std::time::Duration;
use txflood_types::{Address, Coin, KeyPair};

/// Default ceiling on concurrent in-flight split transactions.
pub const DEFAULT_MAX_IN_FLIGHT_SPLITS: usize = 90;

/// Configuration for a full fan-out-and-flood run.
#[derive(Debug, Clone)]
pub struct SpamConfig {
    /// RPC endpoints, one derived sub-tree per endpoint.
    pub endpoints: Vec<String>,

    /// Hex-encoded 32-byte seed of the funded root account's key.
    pub root_key: String,

    /// Number of funded accounts to derive per endpoint.
    pub fan_out: usize,

    /// Transactions each derived account sends before retirement.
    pub repeat: u64,

    /// Fee denomination.
    pub denom: String,

    /// Fee amount per transaction.
    pub fee_amount: u128,

    /// Gas limit per message.
    pub gas_limit: u64,

    /// Destination for load-generator transfers. Defaults to the root's own
    /// address when unset.
    pub receiver: Option<Address>,

    /// Ceiling on concurrent in-flight splits during derivation.
    pub max_in_flight_splits: usize,

    /// Optional path to persist the derived pool before the flood starts.
    pub snapshot_path: Option<PathBuf>,

    /// Timeout waiting for endpoints to answer before the run starts.
    pub ready_timeout: Duration,
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://127.0.0.1:26657".to_string()],
            root_key: String::new(),
            fan_out: 1,
            repeat: 50,
            denom: "stake".to_string(),
            fee_amount: 10,
            gas_limit: 100_000,
            receiver: None,
            max_in_flight_splits: DEFAULT_MAX_IN_FLIGHT_SPLITS,
            snapshot_path: None,
            ready_timeout: Duration::from_secs(30),
        }
    }
}

impl SpamConfig {
    /// Validate the configuration before any network traffic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }
        if self.fan_out == 0 {
            return Err(ConfigError::ZeroFanOut);
        }
        if self.fan_out > (1 << MAX_FAN_OUT_ROUNDS) {
            return Err(ConfigError::FanOutTooLarge {
                requested: self.fan_out,
                max: 1 << MAX_FAN_OUT_ROUNDS,
            });
        }
        if self.repeat == 0 {
            return Err(ConfigError::ZeroRepeat);
        }
        if self.fee_amount == 0 {
            return Err(ConfigError::ZeroFee);
        }
        if self.max_in_flight_splits == 0 {
            return Err(ConfigError::ZeroSplitConcurrency);
        }
        self.root_keypair()?;
        Ok(())
    }

    /// The per-transaction fee as a coin.
    pub fn fee(&self) -> Coin {
        Coin::new(self.denom.clone(), self.fee_amount)
    }

    /// Decode the root keypair from its hex seed.
    pub fn root_keypair(&self) -> Result<KeyPair, ConfigError> {
        let bytes = hex::decode(&self.root_key).map_err(|e| ConfigError::InvalidRootKey {
            reason: e.to_string(),
        })?;
        let seed: [u8; 32] = bytes.try_into().map_err(|_| ConfigError::InvalidRootKey {
            reason: "seed must be exactly 32 bytes".to_string(),
        })?;
        Ok(KeyPair::from_seed(&seed))
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one RPC endpoint is required")]
    NoEndpoints,

    #[error("fan-out must be at least 1")]
    ZeroFanOut,

    #[error("fan-out of {requested} exceeds the maximum of {max}")]
    FanOutTooLarge { requested: usize, max: usize },

    #[error("repeat count must be at least 1")]
    ZeroRepeat,

    #[error("fee amount must be non-zero")]
    ZeroFee,

    #[error("split concurrency must be at least 1")]
    ZeroSplitConcurrency,

    #[error("invalid root key: {reason}")]
    InvalidRootKey { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SpamConfig {
        SpamConfig {
            root_key: hex::encode([1u8; 32]),
            fan_out: 8,
            ..SpamConfig::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_endpoints() {
        let config = SpamConfig {
            endpoints: vec![],
            ..valid_config()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoEndpoints)));
    }

    #[test]
    fn test_rejects_oversized_fan_out() {
        let config = SpamConfig {
            fan_out: (1 << MAX_FAN_OUT_ROUNDS) + 1,
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FanOutTooLarge { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_root_key() {
        let config = SpamConfig {
            root_key: "abcd".to_string(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRootKey { .. })
        ));
    }

    #[test]
    fn test_root_keypair_round_trip() {
        let config = valid_config();
        let kp = config.root_keypair().unwrap();
        assert_eq!(kp.address(), KeyPair::from_seed(&[1u8; 32]).address());
    }
}
