use crate::error::{TrackerError, TrackerResult};
use crate::fetcher::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Explorer endpoints and fetch behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Serves `/rawtx/{txid}` and `/rawaddr/{address}`.
    pub explorer_base_url: String,
    /// Serves `/address/{address}/transactions`.
    pub haskoin_base_url: String,
    pub history_page_limit: u32,
    /// Attempts per wallet history fetch.
    pub retries: u32,
    pub retry_delay_ms: u64,
    /// None leaves the HTTP client's default in place.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl ApiConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Isolation forest parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnomalyConfig {
    /// Expected outlier share, in (0, 0.5].
    pub contamination: f64,
    pub n_trees: usize,
    pub sample_size: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerConfig {
    pub api: ApiConfig,
    pub anomaly: AnomalyConfig,
}

impl TrackerConfig {
    /// Load from a JSON file, e.g. data/tracker_config.json.
    /// In tests, use TrackerConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: TrackerConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TrackerResult<()> {
        crate::anomaly::validate_contamination(self.anomaly.contamination)?;
        if self.anomaly.n_trees == 0 {
            return Err(TrackerError::InvalidConfig {
                reason: "anomaly.n_trees must be at least 1".into(),
            });
        }
        if self.anomaly.sample_size == 0 {
            return Err(TrackerError::InvalidConfig {
                reason: "anomaly.sample_size must be at least 1".into(),
            });
        }
        if self.api.retries == 0 {
            return Err(TrackerError::InvalidConfig {
                reason: "api.retries must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Config with hardcoded defaults for use in unit tests.
    /// No delay between retries.
    pub fn default_test() -> Self {
        Self {
            api: ApiConfig {
                retry_delay_ms: 0,
                ..Self::default().api
            },
            anomaly: AnomalyConfig {
                n_trees: 50,
                ..Self::default().anomaly
            },
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                explorer_base_url: "https://blockchain.info".into(),
                haskoin_base_url: "https://api.blockchain.info/haskoin-store/btc".into(),
                history_page_limit: 20,
                retries: 3,
                retry_delay_ms: 5_000,
                request_timeout_secs: None,
            },
            anomaly: AnomalyConfig {
                contamination: 0.1,
                n_trees: 100,
                sample_size: 256,
                seed: 42,
            },
        }
    }
}
