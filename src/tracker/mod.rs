//! Transaction tracking
//!
//! Searches transactions by message and VM event attributes and returns
//! them with their logs normalized into grouped records.

pub mod filter;
pub mod logs;

use log::{debug, info};
use serde_json::Value;

use crate::api::RestTransport;
use crate::error::ApiError;

pub use filter::{build_filter, BlockFilter, Scalar, TransferQuery, TxQuery, VmQuery};
pub use logs::{format_tx, normalize, FormattedTx, KvRecord, LogRecord, RawLog, RawTx};

/// Transaction search over a REST transport
pub struct Tracker<T: RestTransport> {
    transport: T,
}

impl<T: RestTransport> Tracker<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Query parameters for a search
    pub fn build_filter(&self, query: &TxQuery) -> anyhow::Result<Vec<(String, String)>> {
        Ok(build_filter(query)?.into_iter().collect())
    }

    /// Run a search and format every matching transaction
    pub async fn track(&self, query: &TxQuery) -> anyhow::Result<Vec<FormattedTx>> {
        let params = self.build_filter(query)?;
        debug!("Tracking transactions with filter {:?}", params);

        let response = self.transport.get_json("/txs", &params).await?;
        let txs = parse_search_result(response)?;
        info!("Found {} transaction(s)", txs.len());

        Ok(txs.into_iter().map(format_tx).collect())
    }
}

/// Extract `txs` from a `/txs` search response
pub fn parse_search_result(mut response: Value) -> Result<Vec<RawTx>, ApiError> {
    let txs = match response.get_mut("txs") {
        Some(txs) if txs.is_null() => return Ok(Vec::new()),
        Some(txs) => txs.take(),
        None => return Err(ApiError::UnexpectedResponse("search result has no 'txs'".to_string())),
    };
    serde_json::from_value(txs).map_err(|e| ApiError::UnexpectedResponse(format!("txs: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingTransport {
        response: Value,
        calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    #[async_trait]
    impl RestTransport for RecordingTransport {
        async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push((path.to_string(), query.to_vec()));
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn test_track_formats_results() {
        let transport = RecordingTransport {
            response: json!({
                "total_count": "1",
                "txs": [{
                    "height": "10",
                    "txhash": "FF00",
                    "timestamp": "2020-06-01T10:00:00Z",
                    "gas_wanted": "1000",
                    "gas_used": "900",
                    "raw_log": "[]",
                    "logs": [{"msg_index": 0, "events": [
                        {"type": "vm.contract_events", "attributes": [
                            {"key": "source", "value": "0x1::Account"},
                            {"key": "type", "value": "0x1::Account::ReceivedPaymentEvent"},
                            {"key": "sender_address", "value": "0x1"},
                            {"key": "data", "value": "00"}
                        ]}
                    ]}],
                    "tx": {}
                }]
            }),
            calls: Mutex::new(Vec::new()),
        };
        let tracker = Tracker::new(transport);
        let query = TxQuery {
            action: Some("execute_script".into()),
            block: Some(BlockFilter::Range(vec![Some("0".into()), Some("199263".into())])),
            ..Default::default()
        };

        let txs = tracker.track(&query).await.unwrap();

        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].txhash, "FF00");
        assert_eq!(txs[0].logs[0].vm_events[0]["type"], "0x1::Account::ReceivedPaymentEvent");

        let calls = tracker.transport.calls.lock().unwrap();
        assert_eq!(calls[0].0, "/txs");
        assert!(calls[0].1.contains(&("message.action".to_string(), "execute_script".to_string())));
        assert!(calls[0].1.contains(&("tx.maxheight".to_string(), "199263".to_string())));
    }

    #[test]
    fn test_search_result_without_txs() {
        assert!(parse_search_result(json!({"txs": null})).unwrap().is_empty());
        assert!(parse_search_result(json!({"error": "x"})).is_err());
    }
}
