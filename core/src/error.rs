use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Upstream returned status {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Transaction '{txid}' not found")]
    TransactionNotFound { txid: String },

    #[error("Contamination must be in (0, 0.5], got {value}")]
    InvalidContamination { value: f64 },

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type TrackerResult<T> = Result<T, TrackerError>;
