//! Transaction parser — raw payload to directed transfer records.
//!
//! Every input is paired with every output (full fan-out). This is an
//! approximation: it does not preserve which input funded which output,
//! and one M-input, N-output transaction yields M × N records.
//! Downstream consumers rely on this shape; do not "fix" it.

use crate::{
    payload::{RawTransaction, RawWalletHistory},
    types::{Timestamp, WalletAddress, MINOR_UNITS_PER_COIN, UNKNOWN_WALLET},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One directed wallet-to-wallet transfer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferRecord {
    pub from_wallet: WalletAddress,
    pub to_wallet:   WalletAddress,
    /// BTC, never negative.
    pub amount:      f64,
    pub time:        Option<Timestamp>,
}

impl TransferRecord {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.time.and_then(|t| DateTime::from_timestamp(t, 0))
    }
}

/// Satoshis to BTC. Negative values clamp to 0.
pub fn minor_to_coin(value: i64) -> f64 {
    value.max(0) as f64 / MINOR_UNITS_PER_COIN
}

/// Flatten one transaction into inputs × outputs transfer records.
pub fn parse(raw: &RawTransaction) -> Vec<TransferRecord> {
    let mut records = Vec::with_capacity(raw.inputs.len() * raw.out.len());

    for input in &raw.inputs {
        let from_wallet = input.address().unwrap_or(UNKNOWN_WALLET);
        for output in &raw.out {
            records.push(TransferRecord {
                from_wallet: from_wallet.to_string(),
                to_wallet:   output.addr.clone().unwrap_or_else(|| UNKNOWN_WALLET.to_string()),
                amount:      minor_to_coin(output.value.unwrap_or(0)),
                time:        raw.time,
            });
        }
    }

    log::debug!(
        "Parsed {} transfers from tx {}",
        records.len(),
        raw.id().unwrap_or(UNKNOWN_WALLET)
    );
    records
}

/// Parse every transaction in a wallet history, in order.
pub fn parse_history(history: &RawWalletHistory) -> Vec<TransferRecord> {
    history.txs.iter().flat_map(parse).collect()
}
