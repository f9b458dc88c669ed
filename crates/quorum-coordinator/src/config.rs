//! Coordinator configuration, parsed from a TOML file plus environment overrides.
//!
//! Priority: environment variables > config file > defaults.

use anyhow::{Context, Result};
use quorum_cosigner::MAX_COSIGNERS;
use quorum_keys::ScriptPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// The wallet being assembled
    pub wallet: WalletSection,

    /// Runtime settings
    #[serde(default)]
    pub coordinator: CoordinatorSection,
}

/// Quorum shape and script policy of the wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSection {
    /// Wallet name, also used for the setup file name
    #[serde(default = "default_label")]
    pub label: String,

    /// Signatures required
    pub m: usize,

    /// Total cosigners
    pub n: usize,

    /// Script format: "p2wsh", "p2sh-p2wsh" or "p2sh"
    #[serde(default = "default_format")]
    pub format: String,
}

/// Runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorSection {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prompt for a BIP-39 passphrase when a mnemonic is imported
    #[serde(default)]
    pub ask_passphrase: bool,

    /// Where the coordination setup file is written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for CoordinatorSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            ask_passphrase: false,
            output_dir: default_output_dir(),
        }
    }
}

fn default_label() -> String {
    "multisig".to_string()
}

fn default_format() -> String {
    "p2wsh".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl CoordinatorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CoordinatorConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `QUORUM_LABEL`
    /// - `QUORUM_M`
    /// - `QUORUM_N`
    /// - `QUORUM_FORMAT`
    /// - `QUORUM_LOG_LEVEL`
    /// - `QUORUM_ASK_PASSPHRASE`
    /// - `QUORUM_OUTPUT_DIR`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("QUORUM_LABEL") {
            self.wallet.label = v;
        }
        if let Ok(v) = std::env::var("QUORUM_M") {
            if let Ok(m) = v.parse::<usize>() {
                self.wallet.m = m;
            }
        }
        if let Ok(v) = std::env::var("QUORUM_N") {
            if let Ok(n) = v.parse::<usize>() {
                self.wallet.n = n;
            }
        }
        if let Ok(v) = std::env::var("QUORUM_FORMAT") {
            self.wallet.format = v;
        }
        if let Ok(v) = std::env::var("QUORUM_LOG_LEVEL") {
            self.coordinator.log_level = v;
        }
        if let Ok(v) = std::env::var("QUORUM_ASK_PASSPHRASE") {
            if let Ok(ask) = v.parse::<bool>() {
                self.coordinator.ask_passphrase = ask;
            }
        }
        if let Ok(v) = std::env::var("QUORUM_OUTPUT_DIR") {
            self.coordinator.output_dir = PathBuf::from(v);
        }
    }

    /// Script policy named by `wallet.format`.
    pub fn policy(&self) -> Result<ScriptPolicy> {
        self.wallet
            .format
            .parse::<ScriptPolicy>()
            .with_context(|| format!("wallet.format is not a known script format: {}", self.wallet.format))
    }

    /// File the coordination setup is written to: the label with anything
    /// outside `[A-Za-z0-9_-]` replaced, plus `.txt`.
    pub fn setup_file(&self) -> PathBuf {
        let stem: String = self
            .wallet
            .label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.coordinator.output_dir.join(format!("{}.txt", stem))
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.wallet.label.trim().is_empty(),
            "wallet.label must not be empty"
        );

        anyhow::ensure!(self.wallet.m >= 1, "wallet.m must be >= 1");
        anyhow::ensure!(
            self.wallet.m <= self.wallet.n,
            "wallet.m ({}) must not exceed wallet.n ({})",
            self.wallet.m,
            self.wallet.n
        );
        anyhow::ensure!(
            self.wallet.n <= MAX_COSIGNERS,
            "wallet.n must be <= {}",
            MAX_COSIGNERS
        );

        self.policy()?;

        anyhow::ensure!(
            LOG_LEVELS.contains(&self.coordinator.log_level.to_ascii_lowercase().as_str()),
            "coordinator.log_level must be one of {:?}",
            LOG_LEVELS
        );

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
