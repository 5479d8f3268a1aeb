//! VM message builders
//!
//! Messages are the protocol-level actions carried by a transaction. Only
//! two kinds exist on the VM module:
//! - `vm/MsgExecuteScript` runs a compiled script with encoded arguments
//! - `vm/MsgDeployModule` publishes a compiled module
//!
//! Builders are pure: they decode the compiler's hex output, re-encode it
//! as base64 and stamp the signer address.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::TxError;
use crate::script_args::ScriptArg;

/// Message type tag for script execution
pub const EXECUTE_SCRIPT_TYPE: &str = "vm/MsgExecuteScript";
/// Message type tag for module deployment
pub const DEPLOY_MODULE_TYPE: &str = "vm/MsgDeployModule";

/// Protocol message, serialized as `{"type": ..., "value": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Message {
    #[serde(rename = "vm/MsgExecuteScript")]
    ExecuteScript(ExecuteScript),
    #[serde(rename = "vm/MsgDeployModule")]
    DeployModule(DeployModule),
}

impl Message {
    /// Wire type tag of this message
    pub fn type_tag(&self) -> &'static str {
        match self {
            Message::ExecuteScript(_) => EXECUTE_SCRIPT_TYPE,
            Message::DeployModule(_) => DEPLOY_MODULE_TYPE,
        }
    }

    /// Address that must sign this message
    pub fn signer(&self) -> &str {
        match self {
            Message::ExecuteScript(msg) => &msg.signer,
            Message::DeployModule(msg) => &msg.signer,
        }
    }
}

/// Body of `vm/MsgExecuteScript`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteScript {
    /// Encoded script arguments, `null` when the script takes none
    pub args: Option<Vec<ScriptArg>>,
    /// Base64 compiled script
    pub script: String,
    /// Signer address
    pub signer: String,
}

/// Body of `vm/MsgDeployModule`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployModule {
    /// Base64 compiled module
    pub module: String,
    /// Signer address
    pub signer: String,
}

/// Request for one message, resolved against a signer by [`build_msg`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsgRequest {
    ExecuteScript {
        script_hex: String,
        args: Option<Vec<ScriptArg>>,
    },
    PublishModule {
        code_hex: String,
    },
}

/// Build a message for `signer`
pub fn build_msg(signer: &str, request: MsgRequest) -> Result<Message, TxError> {
    match request {
        MsgRequest::ExecuteScript { script_hex, args } => execute_script_msg(signer, &script_hex, args),
        MsgRequest::PublishModule { code_hex } => publish_module_msg(signer, &code_hex),
    }
}

/// `vm/MsgExecuteScript` for a hex-encoded compiled script
pub fn execute_script_msg(
    signer: &str,
    script_hex: &str,
    args: Option<Vec<ScriptArg>>,
) -> Result<Message, TxError> {
    Ok(Message::ExecuteScript(ExecuteScript {
        args,
        script: hex_to_base64("script", script_hex)?,
        signer: signer.to_string(),
    }))
}

/// `vm/MsgDeployModule` for a hex-encoded compiled module
pub fn publish_module_msg(signer: &str, code_hex: &str) -> Result<Message, TxError> {
    Ok(Message::DeployModule(DeployModule {
        module: hex_to_base64("module", code_hex)?,
        signer: signer.to_string(),
    }))
}

fn hex_to_base64(field: &'static str, payload: &str) -> Result<String, TxError> {
    let payload = payload.strip_prefix("0x").unwrap_or(payload);
    let bytes = hex::decode(payload).map_err(|e| TxError::InvalidPayload {
        field,
        reason: e.to_string(),
    })?;
    Ok(BASE64.encode(bytes))
}
