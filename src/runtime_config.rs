// =============================================================================
// Runtime Configuration — feed source, buffer sizing, poll cadence
// =============================================================================
//
// All fields carry `#[serde(default)]` so that a partial (or empty) JSON file
// loads cleanly. `validate()` is the single fail-fast gate run at startup.
//
// =============================================================================

use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_stream_base_url() -> String {
    "wss://stream.binance.com:9443/ws".to_string()
}

fn default_buffer_capacity() -> usize {
    200
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_cadence_ms() -> u64 {
    800
}

fn default_price_min() -> f64 {
    100.0
}

fn default_price_max() -> f64 {
    200.0
}

fn default_size_min() -> f64 {
    0.5
}

fn default_size_max() -> f64 {
    10.0
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_backoff_jitter() -> f64 {
    0.2
}

// =============================================================================
// FeedSource
// =============================================================================

/// Where trades come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    #[default]
    Live,
    Synthetic,
}

impl std::str::FromStr for FeedSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "synthetic" => Ok(Self::Synthetic),
            other => anyhow::bail!("unknown feed source: {other}"),
        }
    }
}

impl std::fmt::Display for FeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

// =============================================================================
// SyntheticParams
// =============================================================================

/// Ranges and cadence for the synthetic trade generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticParams {
    #[serde(default = "default_cadence_ms")]
    pub cadence_ms: u64,

    #[serde(default = "default_price_min")]
    pub price_min: f64,

    #[serde(default = "default_price_max")]
    pub price_max: f64,

    #[serde(default = "default_size_min")]
    pub size_min: f64,

    #[serde(default = "default_size_max")]
    pub size_max: f64,

    /// Fixed RNG seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            cadence_ms: default_cadence_ms(),
            price_min: default_price_min(),
            price_max: default_price_max(),
            size_min: default_size_min(),
            size_max: default_size_max(),
            seed: None,
        }
    }
}

// =============================================================================
// ReconnectParams
// =============================================================================

/// Live-feed reconnect backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectParams {
    #[serde(default = "default_backoff_base_ms")]
    pub base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub max_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: f64,

    /// Fractional jitter, e.g. 0.2 for +/-20%.
    #[serde(default = "default_backoff_jitter")]
    pub jitter: f64,
}

impl Default for ReconnectParams {
    fn default() -> Self {
        Self {
            base_ms: default_backoff_base_ms(),
            max_ms: default_backoff_max_ms(),
            multiplier: default_backoff_multiplier(),
            jitter: default_backoff_jitter(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub source: FeedSource,

    /// Symbol for the live trade stream.
    #[serde(default = "default_symbol")]
    pub symbol: String,

    #[serde(default = "default_stream_base_url")]
    pub stream_base_url: String,

    /// Number of recent trades retained.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Consumer poll interval.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Address for the read API.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default)]
    pub synthetic: SyntheticParams,

    #[serde(default)]
    pub reconnect: ReconnectParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            source: FeedSource::default(),
            symbol: default_symbol(),
            stream_base_url: default_stream_base_url(),
            buffer_capacity: default_buffer_capacity(),
            poll_interval_ms: default_poll_interval_ms(),
            bind_addr: default_bind_addr(),
            synthetic: SyntheticParams::default(),
            reconnect: ReconnectParams::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            source = %config.source,
            symbol = %config.symbol,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Apply `FLOWSCOPE_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("FLOWSCOPE_SOURCE") {
            self.source = source.parse()?;
        }
        if let Ok(symbol) = std::env::var("FLOWSCOPE_SYMBOL") {
            let symbol = symbol.trim().to_uppercase();
            if !symbol.is_empty() {
                self.symbol = symbol;
            }
        }
        if let Ok(capacity) = std::env::var("FLOWSCOPE_CAPACITY") {
            self.buffer_capacity = capacity
                .trim()
                .parse()
                .with_context(|| format!("invalid FLOWSCOPE_CAPACITY: {capacity}"))?;
        }
        if let Ok(addr) = std::env::var("FLOWSCOPE_BIND_ADDR") {
            self.bind_addr = addr;
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.buffer_capacity > 0, "buffer_capacity must be positive");
        ensure!(self.poll_interval_ms > 0, "poll_interval_ms must be positive");
        ensure!(!self.symbol.trim().is_empty(), "symbol must not be empty");

        let s = &self.synthetic;
        ensure!(s.cadence_ms > 0, "synthetic.cadence_ms must be positive");
        ensure!(
            s.price_min >= 0.0 && s.price_min <= s.price_max,
            "synthetic price range [{}, {}] is invalid",
            s.price_min,
            s.price_max
        );
        ensure!(
            s.size_min >= 0.0 && s.size_min <= s.size_max,
            "synthetic size range [{}, {}] is invalid",
            s.size_min,
            s.size_max
        );
        ensure!(
            s.price_max.is_finite() && s.size_max.is_finite(),
            "synthetic ranges must be finite"
        );

        let r = &self.reconnect;
        ensure!(r.base_ms > 0, "reconnect.base_ms must be positive");
        ensure!(r.max_ms >= r.base_ms, "reconnect.max_ms must be >= base_ms");
        ensure!(r.multiplier >= 1.0, "reconnect.multiplier must be >= 1");
        ensure!(
            (0.0..1.0).contains(&r.jitter),
            "reconnect.jitter must be in [0, 1)"
        );
        Ok(())
    }
}
