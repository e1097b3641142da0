//! Configuration management for linkledger

use crate::error::ChainError;
use crate::miner::Difficulty;
use crate::transaction::Amount;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

/// Default file read by [`load_config`] callers such as the demo binary.
pub const DEFAULT_CONFIG_PATH: &str = "ledger.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerSection,
    #[serde(default)]
    pub miner: MinerSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSection {
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default = "default_mining_reward")]
    pub mining_reward: f64,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            mining_reward: default_mining_reward(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinerSection {
    /// Run the background miner instead of mining on demand.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for MinerSection {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_interval_ms(),
        }
    }
}

impl MinerSection {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Validated ledger parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerConfig {
    pub difficulty: Difficulty,
    pub mining_reward: Amount,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            mining_reward: Amount::from_num(5),
        }
    }
}

impl LedgerSection {
    pub fn to_ledger_config(&self) -> Result<LedgerConfig, ChainError> {
        let difficulty = Difficulty::new(self.difficulty)?;
        if !self.mining_reward.is_finite() || self.mining_reward < 0.0 {
            return Err(ChainError::ConfigError(format!(
                "ledger.mining_reward must be a non-negative number, got {}",
                self.mining_reward
            )));
        }
        let mining_reward = Amount::checked_from_num(self.mining_reward).ok_or_else(|| {
            ChainError::ConfigError(format!(
                "ledger.mining_reward {} is out of range",
                self.mining_reward
            ))
        })?;
        Ok(LedgerConfig {
            difficulty,
            mining_reward,
        })
    }
}

impl Config {
    /// Applies command-line overrides on top of the file. A forced auto miner
    /// turns `miner.enabled` on but never off.
    pub fn with_overrides(
        mut self,
        difficulty: Option<u32>,
        mining_reward: Option<f64>,
        auto_mine: bool,
    ) -> Self {
        if let Some(difficulty) = difficulty {
            self.ledger.difficulty = difficulty;
        }
        if let Some(mining_reward) = mining_reward {
            self.ledger.mining_reward = mining_reward;
        }
        self.miner.enabled |= auto_mine;
        self
    }

    pub fn validate(&self) -> Result<LedgerConfig, ChainError> {
        if self.miner.interval_ms == 0 {
            return Err(ChainError::ConfigError(
                "miner.interval_ms must be greater than zero".to_string(),
            ));
        }
        self.ledger.to_ledger_config()
    }
}

/// Reads `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let config = match fs::read_to_string(path.as_ref()) {
        Ok(contents) => toml::from_str(&contents)?,
        Err(e) if e.kind() == ErrorKind::NotFound => Config::default(),
        Err(e) => return Err(e.into()),
    };
    config.validate()?;
    Ok(config)
}

fn default_difficulty() -> u32 {
    4
}

fn default_mining_reward() -> f64 {
    5.0
}

fn default_interval_ms() -> u64 {
    1_000
}
