//! Explorer fetcher — raw transaction and wallet JSON.
//!
//! RULE: Only this module talks to the network.
//! All HTTP goes through the `Upstream` trait so the retry logic can be
//! exercised against a simulated explorer.
//!
//! Wallet history is best effort: failed attempts are retried with a
//! fixed delay, and exhaustion is reported as `None`, never an error.

use crate::{
    config::ApiConfig,
    error::{TrackerError, TrackerResult},
    payload::{RawTransaction, RawWalletHistory, WalletTxRef},
    types::Timestamp,
};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// A source of JSON documents addressed by URL.
pub trait Upstream {
    /// GET `url`. Non-success statuses are errors; a body that is not
    /// JSON is `TrackerError::Serialization`.
    fn get_json(&self, url: &str) -> TrackerResult<serde_json::Value>;
}

/// Blocking reqwest client against the live explorer.
pub struct HttpUpstream {
    client: Client,
}

impl HttpUpstream {
    pub fn new(timeout: Option<Duration>) -> TrackerResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self { client: builder.build()? })
    }
}

impl Upstream for HttpUpstream {
    fn get_json(&self, url: &str) -> TrackerResult<serde_json::Value> {
        let resp = self.client.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TrackerError::UpstreamStatus {
                url:    url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub retries: u32,
    pub delay:   Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }
}

pub struct Fetcher<U: Upstream> {
    upstream: U,
    api:      ApiConfig,
}

impl<U: Upstream> Fetcher<U> {
    pub fn new(upstream: U, api: ApiConfig) -> Self {
        Self { upstream, api }
    }

    pub fn upstream(&self) -> &U {
        &self.upstream
    }

    /// Single attempt at `/rawtx/{txid}`.
    pub fn fetch_transaction(&self, txid: &str) -> TrackerResult<RawTransaction> {
        let url = format!("{}/rawtx/{txid}", self.api.explorer_base_url);
        let value = self.upstream.get_json(&url).map_err(|e| {
            log::warn!("Failed to fetch transaction {txid}: {e}");
            match e {
                TrackerError::UpstreamStatus { status: 404, .. } => {
                    TrackerError::TransactionNotFound { txid: txid.to_string() }
                }
                other => other,
            }
        })?;
        decode(value)
    }

    /// `/rawaddr/{address}` with up to `retries` attempts.
    /// Returns `None` once attempts are exhausted.
    pub fn fetch_wallet_history(
        &self,
        address: &str,
        retries: u32,
        delay: Duration,
    ) -> Option<RawWalletHistory> {
        let url = format!("{}/rawaddr/{address}", self.api.explorer_base_url);

        for attempt in 1..=retries {
            match self.upstream.get_json(&url) {
                Ok(value) => {
                    log::debug!("Fetched history for {address} on attempt {attempt}");
                    return match decode(value) {
                        Ok(history) => Some(history),
                        Err(e) => {
                            log::warn!("Undecodable history for {address}: {e}");
                            None
                        }
                    };
                }
                Err(TrackerError::Serialization(e)) => {
                    log::warn!("Undecodable history for {address}: {e}");
                    return None;
                }
                Err(e) => {
                    log::warn!("Attempt {attempt}/{retries}: failed to fetch history for {address}: {e}");
                    if attempt < retries && !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        log::warn!("Giving up on history for {address} after {retries} attempts");
        None
    }

    /// `fetch_wallet_history` under a `RetryPolicy`.
    pub fn fetch_wallet_history_with(
        &self,
        address: &str,
        policy: RetryPolicy,
    ) -> Option<RawWalletHistory> {
        self.fetch_wallet_history(address, policy.retries, policy.delay)
    }

    /// First page of the haskoin-store listing for `address`.
    /// Keeps only refs seen in the mempool after `after_timestamp`, when given.
    /// Any failure yields an empty list.
    pub fn fetch_wallet_transactions(
        &self,
        address: &str,
        after_timestamp: Option<Timestamp>,
    ) -> Vec<WalletTxRef> {
        let url = format!(
            "{}/address/{address}/transactions?limit={}&offset=0",
            self.api.haskoin_base_url, self.api.history_page_limit
        );

        let refs: Vec<WalletTxRef> = match self.upstream.get_json(&url).and_then(decode) {
            Ok(refs) => refs,
            Err(e) => {
                log::warn!("Failed to list transactions for {address}: {e}");
                return Vec::new();
            }
        };

        match after_timestamp {
            Some(after) => refs.into_iter().filter(|r| r.mempool_time() > after).collect(),
            None => refs,
        }
    }
}

fn decode<T: DeserializeOwned>(value: serde_json::Value) -> TrackerResult<T> {
    Ok(serde_json::from_value(value)?)
}
