//! Transaction log normalization
//!
//! The chain reports each executed message as a log holding a flat list of
//! events, and each event as a flat list of `{key, value}` attributes. One
//! logical record spans a fixed number of consecutive attributes:
//!
//! | event type            | attributes per record |
//! |-----------------------|-----------------------|
//! | `message`             | 3                     |
//! | `transfer`            | 3                     |
//! | `vm.contract_events`  | 4                     |
//! | `vm.contract_status`  | all (single record)   |
//!
//! Unknown event types are reported and skipped. A malformed event is
//! recorded on its log and does not affect any other event.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::LogError;

/// Attributes of one logical record, later keys overwriting earlier ones
pub type KvRecord = BTreeMap<String, String>;

/// Event attribute as returned by the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

/// Event as returned by the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// Log of one executed message
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawLog {
    #[serde(default)]
    pub msg_index: Option<u64>,
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

/// Event types with a known record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Message,
    Transfer,
    VmContractEvents,
    VmContractStatus,
}

impl EventKind {
    pub fn from_type(event_type: &str) -> Option<Self> {
        match event_type {
            "message" => Some(EventKind::Message),
            "transfer" => Some(EventKind::Transfer),
            "vm.contract_events" => Some(EventKind::VmContractEvents),
            "vm.contract_status" => Some(EventKind::VmContractStatus),
            _ => None,
        }
    }

    /// Attributes per record, `None` when the whole list is one record
    pub fn arity(self) -> Option<usize> {
        match self {
            EventKind::Message | EventKind::Transfer => Some(3),
            EventKind::VmContractEvents => Some(4),
            EventKind::VmContractStatus => None,
        }
    }
}

/// Grouped records of one log
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogRecord {
    pub messages: Vec<KvRecord>,
    pub transfers: Vec<KvRecord>,
    pub vm_events: Vec<KvRecord>,
    pub vm_status: Vec<KvRecord>,
    /// Events that could not be split into records
    #[serde(skip)]
    pub errors: Vec<LogError>,
}

impl LogRecord {
    /// Normalize a single raw log
    pub fn from_raw(log: &RawLog) -> Self {
        let mut record = LogRecord::default();

        for event in &log.events {
            let Some(kind) = EventKind::from_type(&event.event_type) else {
                warn!("{}", LogError::UnrecognizedEvent(event.event_type.clone()));
                continue;
            };

            let records = match kind.arity() {
                Some(arity) => match chunk_attributes(&event.event_type, &event.attributes, arity) {
                    Ok(records) => records,
                    Err(e) => {
                        warn!("Skipping event: {}", e);
                        record.errors.push(e);
                        continue;
                    }
                },
                None => vec![fold_attributes(&event.attributes)],
            };

            let group = match kind {
                EventKind::Message => &mut record.messages,
                EventKind::Transfer => &mut record.transfers,
                EventKind::VmContractEvents => &mut record.vm_events,
                EventKind::VmContractStatus => &mut record.vm_status,
            };
            group.extend(records);
        }

        record
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Normalize every log of a transaction, one record per log
pub fn normalize(logs: &[RawLog]) -> Vec<LogRecord> {
    logs.iter().map(LogRecord::from_raw).collect()
}

/// Split attributes into consecutive groups of `arity` and fold each group
pub fn chunk_attributes(
    event_type: &str,
    attributes: &[Attribute],
    arity: usize,
) -> Result<Vec<KvRecord>, LogError> {
    if arity == 0 || attributes.len() % arity != 0 {
        return Err(LogError::MalformedAttributes {
            event_type: event_type.to_string(),
            len: attributes.len(),
            arity,
        });
    }

    Ok(attributes.chunks(arity).map(fold_attributes).collect())
}

/// Fold `[{key, value}, ...]` into a map
pub fn fold_attributes(attributes: &[Attribute]) -> KvRecord {
    attributes
        .iter()
        .map(|attr| (attr.key.clone(), attr.value.clone().unwrap_or_default()))
        .collect()
}

/// Transaction as returned by `GET /txs`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawTx {
    #[serde(default)]
    pub height: Value,
    pub txhash: String,
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub gas_wanted: Value,
    #[serde(default)]
    pub gas_used: Value,
    #[serde(default)]
    pub logs: Vec<RawLog>,
    /// Textual copy of `logs`, dropped by [`format_tx`]
    #[serde(default)]
    pub raw_log: Option<String>,
    #[serde(default)]
    pub tx: Value,
}

/// Gas requested and consumed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasInfo {
    pub wanted: Value,
    pub used: Value,
}

/// Transaction with normalized logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedTx {
    pub height: Value,
    pub txhash: String,
    pub timestamp: Value,
    pub gas: GasInfo,
    pub logs: Vec<LogRecord>,
    #[serde(rename = "rawTx")]
    pub raw_tx: Value,
}

/// Replace the raw log blob with normalized records
pub fn format_tx(tx: RawTx) -> FormattedTx {
    let logs = normalize(&tx.logs);
    FormattedTx {
        height: tx.height,
        txhash: tx.txhash,
        timestamp: tx.timestamp,
        gas: GasInfo {
            wanted: tx.gas_wanted,
            used: tx.gas_used,
        },
        logs,
        raw_tx: tx.tx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<Attribute> {
        pairs.iter().map(|(k, v)| Attribute::new(*k, *v)).collect()
    }

    fn event(event_type: &str, pairs: &[(&str, &str)]) -> RawEvent {
        RawEvent {
            event_type: event_type.to_string(),
            attributes: attrs(pairs),
        }
    }

    #[test]
    fn test_message_chunks_of_three() {
        let log = RawLog {
            msg_index: Some(0),
            events: vec![event(
                "message",
                &[
                    ("action", "execute_script"),
                    ("module", "vm"),
                    ("sender", "wallet1a"),
                    ("action", "send"),
                    ("module", "bank"),
                    ("sender", "wallet1b"),
                ],
            )],
        };
        let record = LogRecord::from_raw(&log);

        assert_eq!(record.messages.len(), 2);
        assert_eq!(record.messages[0]["action"], "execute_script");
        assert_eq!(record.messages[1]["module"], "bank");
        assert!(record.is_clean());
    }

    #[test]
    fn test_malformed_event_isolated() {
        let log = RawLog {
            msg_index: None,
            events: vec![
                event(
                    "message",
                    &[
                        ("a", "1"),
                        ("b", "2"),
                        ("c", "3"),
                        ("a", "4"),
                        ("b", "5"),
                        ("c", "6"),
                        ("a", "7"),
                    ],
                ),
                event(
                    "transfer",
                    &[("recipient", "wallet1r"), ("sender", "wallet1s"), ("amount", "10xfi")],
                ),
            ],
        };
        let record = LogRecord::from_raw(&log);

        assert!(record.messages.is_empty());
        assert_eq!(record.transfers.len(), 1);
        assert_eq!(record.transfers[0]["amount"], "10xfi");
        assert_eq!(
            record.errors,
            vec![LogError::MalformedAttributes {
                event_type: "message".to_string(),
                len: 7,
                arity: 3,
            }]
        );
    }

    #[test]
    fn test_vm_contract_event() {
        let log = RawLog {
            msg_index: None,
            events: vec![event(
                "vm.contract_events",
                &[("source", "A"), ("type", "B"), ("sender_address", "C"), ("data", "D")],
            )],
        };
        let record = LogRecord::from_raw(&log);

        let expected: KvRecord = [("source", "A"), ("type", "B"), ("sender_address", "C"), ("data", "D")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(record.vm_events, vec![expected]);
    }

    #[test]
    fn test_status_is_single_record_and_last_write_wins() {
        let log = RawLog {
            msg_index: None,
            events: vec![event(
                "vm.contract_status",
                &[("status", "discard"), ("major_status", "4016"), ("status", "keep")],
            )],
        };
        let record = LogRecord::from_raw(&log);

        assert_eq!(record.vm_status.len(), 1);
        assert_eq!(record.vm_status[0]["status"], "keep");
        assert_eq!(record.vm_status[0].len(), 2);
    }

    #[test]
    fn test_unknown_event_ignored() {
        let log = RawLog {
            msg_index: None,
            events: vec![
                event("burn", &[("burner", "x")]),
                event("message", &[("action", "a"), ("module", "m"), ("sender", "s")]),
            ],
        };
        let record = LogRecord::from_raw(&log);

        assert_eq!(record.messages.len(), 1);
        assert!(record.is_clean());
    }

    #[test]
    fn test_group_order_is_fixed() {
        let log = RawLog {
            msg_index: None,
            events: vec![
                event("vm.contract_status", &[("status", "keep")]),
                event("transfer", &[("recipient", "r"), ("sender", "s"), ("amount", "1xfi")]),
            ],
        };
        let json = serde_json::to_string(&LogRecord::from_raw(&log)).unwrap();

        assert_eq!(
            json,
            r#"{"messages":[],"transfers":[{"amount":"1xfi","recipient":"r","sender":"s"}],"vm_events":[],"vm_status":[{"status":"keep"}]}"#
        );
    }

    #[test]
    fn test_format_tx() {
        let raw: RawTx = serde_json::from_value(json!({
            "height": "1200",
            "txhash": "ABCD",
            "timestamp": "2020-06-01T10:00:00Z",
            "gas_wanted": "200000",
            "gas_used": "53000",
            "raw_log": "[{\"msg_index\":0}]",
            "logs": [{"msg_index": 0, "log": "", "events": [
                {"type": "message", "attributes": [
                    {"key": "action", "value": "execute_script"},
                    {"key": "module", "value": "vm"},
                    {"key": "sender", "value": "wallet1a"}
                ]}
            ]}],
            "tx": {"type": "cosmos-sdk/StdTx", "value": {}}
        }))
        .unwrap();
        let formatted = serde_json::to_value(format_tx(raw)).unwrap();

        assert_eq!(formatted["height"], json!("1200"));
        assert_eq!(formatted["gas"], json!({"wanted": "200000", "used": "53000"}));
        assert_eq!(formatted["logs"][0]["messages"][0]["module"], json!("vm"));
        assert_eq!(formatted["rawTx"]["type"], json!("cosmos-sdk/StdTx"));
        assert!(formatted.get("raw_log").is_none());
    }

    #[test]
    fn test_null_attribute_value() {
        let event: RawEvent =
            serde_json::from_value(json!({"type": "vm.contract_status", "attributes": [{"key": "status"}]}))
                .unwrap();
        let record = LogRecord::from_raw(&RawLog {
            msg_index: None,
            events: vec![event],
        });
        assert_eq!(record.vm_status[0]["status"], "");
    }
}
