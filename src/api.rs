//! REST client for a dfinance node
//!
//! This module handles:
//! - Account lookups for signing
//! - Transaction broadcast and lookup
//! - Transaction search used by the tracker
//! - VM compilation, validator and oracle queries
//! - Currency destroys and multisig issue status
//!
//! No retries are performed; callers wrap requests if they need them.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::ApiError;
use crate::tx::{AccountState, BroadcastMode, BroadcastRequest, Coin, SignedEnvelope};

/// Transport used by the tracker, implemented by [`Api`]
#[async_trait]
pub trait RestTransport: Send + Sync {
    /// GET `path` with query parameters and return the JSON body
    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError>;
}

/// Account as returned by `/auth/accounts/{address}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub coins: Vec<Coin>,
    #[serde(flatten)]
    pub state: AccountState,
}

/// Position of a validator in the validator list
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorIndex {
    /// 1-based position, `None` when the address is not a validator
    pub index: Option<usize>,
    pub total: usize,
    pub validators: Vec<Value>,
}

/// Chain error code for an unknown multisig call
const CALL_NOT_FOUND_CODE: u64 = 403;

/// Readable view of a multisig issue call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueStatus {
    pub exists: bool,
    pub msg_id: Option<Value>,
    pub msg_data: Option<Value>,
    pub approved: bool,
    pub votes: Vec<Value>,
    pub creator: Option<Value>,
    /// Call as returned by the node
    pub raw: Option<Value>,
}

impl IssueStatus {
    /// Build the view from `/multisig/unique/{id}` output
    pub fn from_call(call: Option<Value>) -> Self {
        let Some(raw) = call else {
            return Self {
                exists: false,
                msg_id: None,
                msg_data: None,
                approved: false,
                votes: Vec::new(),
                creator: None,
                raw: None,
            };
        };

        let field = |key: &str| Some(raw["call"][key].clone()).filter(|v| !v.is_null());
        Self {
            exists: true,
            msg_id: field("id"),
            msg_data: field("msg_data"),
            approved: raw["call"]["approved"].as_bool().unwrap_or(false),
            votes: raw["votes"].as_array().cloned().unwrap_or_default(),
            creator: field("creator"),
            raw: Some(raw),
        }
    }
}

/// REST API client
pub struct Api {
    client: Client,
    base_url: Url,
}

impl Api {
    /// Create a client for the node REST endpoint
    pub fn new(rest_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(rest_url).map_err(|e| ApiError::Url(format!("{}: {}", rest_url, e)))?;
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, base_url })
    }

    /// Resolve a path against the base URL
    pub fn path(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Url(format!("{}: {}", path, e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> Result<T, ApiError> {
        let url = self.path(path)?;
        debug!("GET {}", url);
        let response = self.client.get(url).query(query).send().await?;
        read_json(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let url = self.path(path)?;
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        read_json(response).await
    }

    /// Raw GET returning the untouched JSON body
    pub async fn raw_request(&self, path: &str) -> Result<Value, ApiError> {
        self.get(path, &[]).await
    }

    /// Account number, sequence and balance, `None` for unknown accounts
    pub async fn get_account(&self, address: &str) -> Result<Option<AccountInfo>, ApiError> {
        let response: Value = self.get(&format!("/auth/accounts/{}", address), &[]).await?;
        let value = &response["result"]["value"];
        if value.is_null() || value.get("account_number").is_none() {
            return Ok(None);
        }
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| ApiError::UnexpectedResponse(format!("account: {}", e)))
    }

    /// Broadcast a signed transaction
    pub async fn broadcast_tx(&self, tx: &SignedEnvelope, mode: BroadcastMode) -> Result<Value, ApiError> {
        self.post("/txs", &BroadcastRequest { tx, mode }).await
    }

    /// Look up a transaction by hash
    pub async fn get_transaction_by_hash(&self, hash: &str) -> Result<Value, ApiError> {
        let response: Value = self.get(&format!("/txs/{}", hash), &[]).await?;
        Ok(result_of(response))
    }

    /// Compile Move source for an account
    pub async fn compile(&self, address: &str, code: &str) -> Result<Value, ApiError> {
        let response: Value = self
            .post("/vm/compile", &json!({ "address": address, "code": code }))
            .await?;
        Ok(result_of(response))
    }

    /// Current validator set
    pub async fn get_validators(&self) -> Result<Vec<Value>, ApiError> {
        let response: Value = self.get("/poa/validators", &[]).await?;
        match response["result"]["validators"].as_array() {
            Some(validators) => Ok(validators.clone()),
            None => Err(ApiError::UnexpectedResponse("validators list missing".to_string())),
        }
    }

    /// Position of `address` in the validator list. Relies on the list order being stable.
    pub async fn get_validator_index(&self, address: &str) -> Result<ValidatorIndex, ApiError> {
        let validators = self.get_validators().await?;
        Ok(validator_index(address, validators))
    }

    /// One page of currency destroys (withdraws)
    pub async fn get_destroys(&self, page: u64, limit: u64) -> Result<Vec<Value>, ApiError> {
        let query = [("page".to_string(), page.to_string()), ("limit".to_string(), limit.to_string())];
        let response: Value = self.get("/currencies/withdraws", &query).await?;
        Ok(response["result"].as_array().cloned().unwrap_or_default())
    }

    /// Multisig call by unique id, usually hex of sha256(chain id + symbol + tx hash).
    /// `None` when the node does not know the call.
    pub async fn get_call_by_unique_id(&self, unique_id: &str) -> Result<Option<Value>, ApiError> {
        let response = self.get(&format!("/multisig/unique/{}", unique_id), &[]).await;
        call_from_response(response)
    }

    /// Issue status for a multisig unique id
    pub async fn get_issue_status(&self, unique_id: &str) -> Result<IssueStatus, ApiError> {
        let call = self.get_call_by_unique_id(unique_id).await?;
        Ok(IssueStatus::from_call(call))
    }

    /// Assets tracked by the oracle
    pub async fn get_oracle_assets(&self) -> Result<Value, ApiError> {
        self.get("/oracle/assets", &[]).await
    }

    /// Current price for a ticker such as `ETH_BTC`
    pub async fn get_price(&self, ticker: &str) -> Result<Value, ApiError> {
        self.get(&format!("/oracle/currentprice/{}", ticker.to_lowercase()), &[])
            .await
    }
}

#[async_trait]
impl RestTransport for Api {
    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
        self.get(path, query).await
    }
}

fn validator_index(address: &str, validators: Vec<Value>) -> ValidatorIndex {
    let index = validators
        .iter()
        .position(|v| v["address"].as_str() == Some(address))
        .map(|i| i + 1);
    ValidatorIndex {
        index,
        total: validators.len(),
        validators,
    }
}

fn call_from_response(response: Result<Value, ApiError>) -> Result<Option<Value>, ApiError> {
    match response {
        Ok(response) => Ok(Some(result_of(response)).filter(|call| !call.is_null())),
        Err(ApiError::Status { ref body, .. }) if is_call_not_found(body) => {
            debug!("Multisig call not found");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

// The code may arrive as a number or a string.
fn is_call_not_found(body: &Value) -> bool {
    match &body["code"] {
        Value::Number(code) => code.as_u64() == Some(CALL_NOT_FOUND_CODE),
        Value::String(code) => code.parse::<u64>().ok() == Some(CALL_NOT_FOUND_CODE),
        _ => false,
    }
}

fn result_of(mut response: Value) -> Value {
    if response.get("result").is_some() {
        response["result"].take()
    } else {
        response
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            code: status.as_u16(),
            body: parse_error_body(&text),
        });
    }
    Ok(response.json::<T>().await?)
}

/// Node errors carry a JSON document inside the `error` string when possible
pub fn parse_error_body(text: &str) -> Value {
    let Ok(body) = serde_json::from_str::<Value>(text) else {
        return Value::String(text.to_string());
    };
    body.get("error")
        .and_then(Value::as_str)
        .and_then(|inner| serde_json::from_str::<Value>(inner).ok())
        .unwrap_or(body)
}
