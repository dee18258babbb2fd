use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per item (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
    /// Backoff multiplier per attempt (must be > 1).
    pub multiplier: f64,
    /// Add uniform jitter in [0, delay) to each backoff sleep.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Request budget for one source: a token bucket refilled at `requests_per_sec`
/// with at most `burst` tokens banked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SourceBudget {
    pub requests_per_sec: f64,
    pub burst: f64,
}

impl SourceBudget {
    pub const fn new(requests_per_sec: f64, burst: f64) -> Self {
        Self {
            requests_per_sec,
            burst,
        }
    }
}

/// Per-source budgets. Defaults: aggressive for the official API, moderate for
/// the stats REST endpoints, one request every two seconds for third-party
/// pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBudgets {
    pub api: SourceBudget,
    pub events: SourceBudget,
    pub shifts: SourceBudget,
    pub standings: SourceBudget,
}

impl Default for SourceBudgets {
    fn default() -> Self {
        Self {
            api: SourceBudget::new(5.0, 5.0),
            events: SourceBudget::new(2.0, 2.0),
            shifts: SourceBudget::new(2.0, 2.0),
            standings: SourceBudget::new(0.5, 1.0),
        }
    }
}

/// Global configuration loaded from `~/.config/hsr/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HsrConfig {
    /// Maximum concurrent in-flight item fetches per source. The rate
    /// limiter, not this bound, is the actual throttle.
    pub worker_pool_size: usize,
    /// Per-request timeout in seconds for item fetches.
    pub fetch_timeout_secs: u64,
    /// Per-source request budgets.
    #[serde(default)]
    pub budgets: SourceBudgets,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Directory for rendered validation reports (None = current directory).
    #[serde(default)]
    pub report_dir: Option<String>,
}

impl Default for HsrConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 8,
            fetch_timeout_secs: 30,
            budgets: SourceBudgets::default(),
            retry: None,
            report_dir: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hsr")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HsrConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = HsrConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: HsrConfig = toml::from_str(&data)?;
    Ok(cfg)
}
