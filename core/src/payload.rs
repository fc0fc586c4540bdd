//! Raw explorer payloads.
//!
//! RULE: Everything the explorer sends is untrusted and every field
//! is optional. Missing fields default here; nothing past this module
//! ever sees a partially-populated JSON object.

use crate::types::{Timestamp, Txid, WalletAddress};
use serde::{Deserialize, Deserializer, Serialize};

/// Explicit `null` decodes like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single transaction as returned by `/rawtx/{txid}` and inside `txs[]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawTransaction {
    pub hash:   Option<Txid>,
    /// Some explorers name the id `txid` instead of `hash`.
    pub txid:   Option<Txid>,
    pub time:   Option<Timestamp>,
    #[serde(deserialize_with = "null_as_default")]
    pub inputs: Vec<RawInput>,
    #[serde(deserialize_with = "null_as_default")]
    pub out:    Vec<RawOutput>,
}

impl RawTransaction {
    /// Transaction id, preferring `hash` over `txid`.
    pub fn id(&self) -> Option<&str> {
        self.hash.as_deref().or(self.txid.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawInput {
    pub prev_out: Option<RawPrevOut>,
}

impl RawInput {
    /// The funding address, if the explorer knows it.
    pub fn address(&self) -> Option<&str> {
        self.prev_out.as_ref().and_then(|p| p.addr.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawPrevOut {
    pub addr:  Option<WalletAddress>,
    pub value: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawOutput {
    pub addr:  Option<WalletAddress>,
    /// Satoshis.
    pub value: Option<i64>,
}

/// A wallet's history as returned by `/rawaddr/{address}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawWalletHistory {
    pub address: Option<WalletAddress>,
    pub n_tx:    Option<u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub txs:     Vec<RawTransaction>,
}

/// One entry of the haskoin-store address transaction listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WalletTxRef {
    pub txid:  Txid,
    pub block: Option<BlockRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlockRef {
    pub height:  Option<u64>,
    pub mempool: Option<i64>,
}

impl WalletTxRef {
    /// `block.mempool`, 0 when absent.
    pub fn mempool_time(&self) -> i64 {
        self.block.as_ref().and_then(|b| b.mempool).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default() {
        let raw: RawTransaction = serde_json::from_str(
            r#"{"inputs": [{}, {"prev_out": {}}], "out": [{"value": 5}]}"#,
        )
        .unwrap();
        assert_eq!(raw.inputs.len(), 2);
        assert!(raw.inputs[0].address().is_none());
        assert!(raw.inputs[1].address().is_none());
        assert_eq!(raw.out[0].addr, None);
        assert_eq!(raw.time, None);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let raw: RawTransaction = serde_json::from_str(
            r#"{"hash": "ab", "time": 1700000000, "size": 225, "weight": 900,
                "inputs": [{"sequence": 1, "prev_out": {"addr": "A", "value": 10, "spent": true}}],
                "out": [{"addr": "B", "value": 9, "n": 0}]}"#,
        )
        .unwrap();
        assert_eq!(raw.hash.as_deref(), Some("ab"));
        assert_eq!(raw.inputs[0].address(), Some("A"));
        assert_eq!(raw.out[0].value, Some(9));
    }

    #[test]
    fn id_falls_back_to_txid() {
        let raw: RawTransaction = serde_json::from_str(r#"{"txid": "cd"}"#).unwrap();
        assert_eq!(raw.id(), Some("cd"));

        let raw: RawTransaction = serde_json::from_str(r#"{"hash": "ab", "txid": "cd"}"#).unwrap();
        assert_eq!(raw.id(), Some("ab"));

        assert_eq!(RawTransaction::default().id(), None);
    }

    #[test]
    fn null_lists_decode_as_empty() {
        let raw: RawTransaction =
            serde_json::from_str(r#"{"hash": "ab", "inputs": null, "out": null}"#).unwrap();
        assert!(raw.inputs.is_empty());
        assert!(raw.out.is_empty());

        let history: RawWalletHistory =
            serde_json::from_str(r#"{"address": "R1", "txs": null}"#).unwrap();
        assert!(history.txs.is_empty());
        assert_eq!(history.address.as_deref(), Some("R1"));
    }

    #[test]
    fn wallet_tx_ref_mempool_defaults_to_zero() {
        let refs: Vec<WalletTxRef> = serde_json::from_str(
            r#"[{"txid": "t1", "block": {"height": 800000}},
                {"txid": "t2", "block": {"mempool": 1700000000}},
                {"txid": "t3"}]"#,
        )
        .unwrap();
        assert_eq!(refs[0].mempool_time(), 0);
        assert_eq!(refs[1].mempool_time(), 1_700_000_000);
        assert_eq!(refs[2].mempool_time(), 0);
    }
}
