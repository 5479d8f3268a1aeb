//! Transaction search filters
//!
//! `GET /txs` filters on chain-native dotted event keys. Callers describe a
//! search with the nested [`TxQuery`] instead, and [`build_filter`] maps it
//! through a fixed key table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::FilterError;

/// Human-readable key to chain query key
pub const KEY_MAP: &[(&str, &str)] = &[
    ("limit", "limit"),
    ("action", "message.action"),
    ("sender", "message.sender"),
    ("module", "message.module"),
    ("vm.module", "vm.contract_events.source"),
    ("vm.event", "vm.contract_events.type"),
    ("vm.sender", "vm.contract_events.sender_address"),
    ("vm.status", "vm.contract_status.status"),
    ("transfer.recipient", "transfer.recipient"),
    ("transfer.sender", "transfer.sender"),
    ("transfer.amount", "transfer.amount"),
];

/// Lowest block height key
pub const MIN_HEIGHT_KEY: &str = "tx.minheight";
/// Highest block height key
pub const MAX_HEIGHT_KEY: &str = "tx.maxheight";

/// Chain query key for a human-readable key
pub fn chain_key(key: &str) -> Option<&'static str> {
    KEY_MAP
        .iter()
        .find(|(human, _)| *human == key)
        .map(|(_, chain)| *chain)
}

/// Number or string as found in hand-written queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Num(u64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Num(n) => write!(f, "{}", n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for Scalar {
    fn from(n: u64) -> Self {
        Scalar::Num(n)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

/// Block filter: one height, or a `[from, to]` range where `to` defaults to `from`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockFilter {
    Height(Scalar),
    Range(Vec<Option<Scalar>>),
}

/// VM event filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmQuery {
    pub module: Option<String>,
    pub event: Option<String>,
    pub sender: Option<String>,
    pub status: Option<String>,
}

/// Transfer event filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferQuery {
    pub recipient: Option<String>,
    pub sender: Option<String>,
    pub amount: Option<String>,
}

/// Nested transaction search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxQuery {
    pub limit: Option<Scalar>,
    pub action: Option<String>,
    pub sender: Option<String>,
    pub module: Option<String>,
    pub block: Option<BlockFilter>,
    #[serde(default)]
    pub vm: VmQuery,
    #[serde(default)]
    pub transfer: TransferQuery,
}

impl TxQuery {
    /// Set human-readable keys in table order
    fn entries(&self) -> Vec<(&'static str, String)> {
        let candidates: [(&'static str, Option<String>); 11] = [
            ("limit", self.limit.as_ref().map(Scalar::to_string)),
            ("action", self.action.clone()),
            ("sender", self.sender.clone()),
            ("module", self.module.clone()),
            ("vm.module", self.vm.module.clone()),
            ("vm.event", self.vm.event.clone()),
            ("vm.sender", self.vm.sender.clone()),
            ("vm.status", self.vm.status.clone()),
            ("transfer.recipient", self.transfer.recipient.clone()),
            ("transfer.sender", self.transfer.sender.clone()),
            ("transfer.amount", self.transfer.amount.clone()),
        ];

        candidates
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect()
    }
}

/// Flatten a query into chain query parameters
pub fn build_filter(query: &TxQuery) -> Result<BTreeMap<String, String>, FilterError> {
    let mut filter = BTreeMap::new();

    for (key, value) in query.entries() {
        if let Some(chain) = chain_key(key) {
            filter.insert(chain.to_string(), value);
        }
    }

    if let Some(block) = &query.block {
        let (from, to) = match block {
            BlockFilter::Height(height) => (height.clone(), height.clone()),
            BlockFilter::Range(range) => {
                let from = range
                    .first()
                    .cloned()
                    .flatten()
                    .ok_or(FilterError::InvalidBlockFilter)?;
                let to = range.get(1).cloned().flatten().unwrap_or_else(|| from.clone());
                (from, to)
            }
        };
        filter.insert(MIN_HEIGHT_KEY.to_string(), from.to_string());
        filter.insert(MAX_HEIGHT_KEY.to_string(), to.to_string());
    }

    Ok(filter)
}
