//! Transaction assembly and signing
//!
//! A transaction is assembled in three steps, in this order:
//! 1. Build the signable document with fields in the order
//!    `account_number, chain_id, fee, memo, msgs, sequence`, the account
//!    number and sequence rendered as decimal strings
//! 2. Hand the document to the `Signer`
//! 3. Wrap messages, fee, memo and the signature into a `cosmos-sdk/StdTx`
//!    envelope whose signature entry keeps the numeric account values
//!
//! Example:
//! ```ignore
//! let params = TxParams::new().with_account(account).with_wallet(&wallet).with_gas("500000");
//! let tx = TxBuilder::new(params)
//!     .multi()
//!     .execute_script(script_hex, Some(args))?
//!     .publish_module(module_hex)?
//!     .combine()?;
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::debug;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::TxError;
use crate::msgs::{build_msg, Message, MsgRequest};
use crate::script_args::ScriptArg;
use crate::signer::Signer;

/// Chain id used when none is configured
pub const DEFAULT_CHAIN_ID: &str = "dn-testnet";
/// Denomination of the fixed fee line
pub const FEE_DENOM: &str = "xfi";
/// Amount of the fixed fee line
pub const FEE_AMOUNT: &str = "1";
/// Envelope type tag
pub const STD_TX_TYPE: &str = "cosmos-sdk/StdTx";
/// Public key scheme tag
pub const PUB_KEY_TYPE: &str = "tendermint/PubKeySecp256k1";

/// On-chain account state needed for signing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    #[serde(deserialize_with = "u64_from_str_or_num")]
    pub account_number: u64,
    #[serde(deserialize_with = "u64_from_str_or_num")]
    pub sequence: u64,
}

/// Parameters shared by every message of a transaction
#[derive(Clone, Default)]
pub struct TxParams<'a> {
    pub account: Option<AccountState>,
    pub wallet: Option<&'a dyn Signer>,
    pub gas: Option<String>,
    pub chain_id: Option<String>,
    pub memo: Option<String>,
}

impl<'a> TxParams<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, account: AccountState) -> Self {
        self.account = Some(account);
        self
    }

    pub fn with_wallet(mut self, wallet: &'a dyn Signer) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn with_gas(mut self, gas: impl Into<String>) -> Self {
        self.gas = Some(gas.into());
        self
    }

    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = Some(chain_id.into());
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    fn signer(&self) -> Result<&'a dyn Signer, TxError> {
        self.wallet.ok_or(TxError::MissingField("wallet"))
    }
}

/// Single coin amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub amount: String,
    pub denom: String,
}

/// Transaction fee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub amount: Vec<Coin>,
    pub gas: String,
}

impl Fee {
    /// The fixed `1xfi` fee line with the given gas limit
    pub fn with_gas(gas: impl Into<String>) -> Self {
        Self {
            amount: vec![Coin {
                amount: FEE_AMOUNT.to_string(),
                denom: FEE_DENOM.to_string(),
            }],
            gas: gas.into(),
        }
    }
}

/// Document the account key signs. Field order is part of the signing contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignableDocument {
    pub account_number: String,
    pub chain_id: String,
    pub fee: Fee,
    pub memo: String,
    pub msgs: Vec<Message>,
    pub sequence: String,
}

impl SignableDocument {
    /// Key-sorted, whitespace-free JSON bytes that get hashed and signed
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, TxError> {
        // serde_json::Value keeps object keys sorted
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_vec(&value)?)
    }
}

/// Public key attached to a signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey {
    #[serde(rename = "type")]
    pub key_type: String,
    /// Base64 compressed key
    pub value: String,
}

/// Signature entry of the envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    pub account_number: u64,
    pub pub_key: PubKey,
    pub sequence: u64,
    /// Base64 compact signature
    pub signature: String,
}

/// Broadcast-ready transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    #[serde(rename = "type")]
    pub tx_type: String,
    pub msg: Vec<Message>,
    pub fee: Fee,
    pub memo: String,
    pub signatures: Vec<StdSignature>,
}

/// Broadcast mode accepted by `POST /txs`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastMode {
    #[default]
    Async,
    Sync,
    Block,
}

impl std::str::FromStr for BroadcastMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "async" => Ok(BroadcastMode::Async),
            "sync" => Ok(BroadcastMode::Sync),
            "block" => Ok(BroadcastMode::Block),
            other => Err(format!("unknown broadcast mode '{}', expected async, sync or block", other)),
        }
    }
}

/// Body of `POST /txs`
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastRequest<'a> {
    pub tx: &'a SignedEnvelope,
    pub mode: BroadcastMode,
}

/// Build the signable document for `msgs`
pub fn signable_document(params: &TxParams<'_>, msgs: Vec<Message>) -> Result<SignableDocument, TxError> {
    let account = params.account.ok_or(TxError::MissingField("account"))?;
    let gas = params.gas.clone().ok_or(TxError::MissingField("gas"))?;

    Ok(SignableDocument {
        account_number: account.account_number.to_string(),
        chain_id: params
            .chain_id
            .clone()
            .unwrap_or_else(|| DEFAULT_CHAIN_ID.to_string()),
        fee: Fee::with_gas(gas),
        memo: params.memo.clone().unwrap_or_default(),
        msgs,
        sequence: account.sequence.to_string(),
    })
}

/// Sign `msgs` and wrap them into a `cosmos-sdk/StdTx` envelope
pub fn wrap_std_tx(params: &TxParams<'_>, msgs: Vec<Message>) -> Result<SignedEnvelope, TxError> {
    let signer = params.signer()?;
    let account = params.account.ok_or(TxError::MissingField("account"))?;
    let document = signable_document(params, msgs)?;

    debug!(
        "Signing {} message(s) for {} on {} (sequence {})",
        document.msgs.len(),
        signer.address(),
        document.chain_id,
        document.sequence
    );

    let output = signer
        .sign(&document)
        .map_err(|e| TxError::SigningFailed(format!("{:#}", e)))?;

    Ok(SignedEnvelope {
        tx_type: STD_TX_TYPE.to_string(),
        msg: document.msgs,
        fee: document.fee,
        memo: document.memo,
        signatures: vec![StdSignature {
            account_number: account.account_number,
            pub_key: PubKey {
                key_type: PUB_KEY_TYPE.to_string(),
                value: BASE64.encode(&output.public_key),
            },
            sequence: account.sequence,
            signature: BASE64.encode(&output.signature),
        }],
    })
}

/// Builds single-message transactions, or hands out a [`MultiTxBuilder`]
#[derive(Clone)]
pub struct TxBuilder<'a> {
    params: TxParams<'a>,
}

impl<'a> TxBuilder<'a> {
    pub fn new(params: TxParams<'a>) -> Self {
        Self { params }
    }

    /// Signed transaction holding one message
    pub fn build(&self, request: MsgRequest) -> Result<SignedEnvelope, TxError> {
        let msg = build_msg(self.params.signer()?.address(), request)?;
        wrap_std_tx(&self.params, vec![msg])
    }

    pub fn execute_script(
        &self,
        script_hex: &str,
        args: Option<Vec<ScriptArg>>,
    ) -> Result<SignedEnvelope, TxError> {
        self.build(MsgRequest::ExecuteScript {
            script_hex: script_hex.to_string(),
            args,
        })
    }

    pub fn publish_module(&self, code_hex: &str) -> Result<SignedEnvelope, TxError> {
        self.build(MsgRequest::PublishModule {
            code_hex: code_hex.to_string(),
        })
    }

    /// Start accumulating several messages into one transaction
    pub fn multi(&self) -> MultiTxBuilder<'a> {
        MultiTxBuilder {
            params: self.params.clone(),
            msgs: Vec::new(),
        }
    }
}

/// Accumulates messages in call order and signs them together
#[derive(Clone)]
pub struct MultiTxBuilder<'a> {
    params: TxParams<'a>,
    msgs: Vec<Message>,
}

impl<'a> MultiTxBuilder<'a> {
    pub fn push(mut self, request: MsgRequest) -> Result<Self, TxError> {
        let msg = build_msg(self.params.signer()?.address(), request)?;
        self.msgs.push(msg);
        Ok(self)
    }

    pub fn execute_script(self, script_hex: &str, args: Option<Vec<ScriptArg>>) -> Result<Self, TxError> {
        self.push(MsgRequest::ExecuteScript {
            script_hex: script_hex.to_string(),
            args,
        })
    }

    pub fn publish_module(self, code_hex: &str) -> Result<Self, TxError> {
        self.push(MsgRequest::PublishModule {
            code_hex: code_hex.to_string(),
        })
    }

    /// Messages accumulated so far
    pub fn msgs(&self) -> &[Message] {
        &self.msgs
    }

    /// Sign all accumulated messages as one transaction
    pub fn combine(self) -> Result<SignedEnvelope, TxError> {
        wrap_std_tx(&self.params, self.msgs)
    }
}

// The REST API returns account numbers as strings, older nodes as numbers.
fn u64_from_str_or_num<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct U64Visitor;

    impl<'de> de::Visitor<'de> for U64Visitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an unsigned integer or a decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            v.parse().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(U64Visitor)
}
