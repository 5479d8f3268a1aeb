//! Dfinance client library
//!
//! Client-side toolkit for the dfinance chain and its Move VM:
//! - `script_args`: encode typed values into VM script arguments
//! - `msgs`: build `vm/MsgExecuteScript` and `vm/MsgDeployModule` messages
//! - `tx`: assemble, sign and wrap transactions into `cosmos-sdk/StdTx`
//! - `tracker`: search transactions and normalize their event logs
//! - `wallet`: mnemonic-derived secp256k1 signing keys
//! - `api`: thin REST client for a node
//! - `config`: client configuration

pub mod address;
pub mod api;
pub mod config;
pub mod error;
pub mod msgs;
pub mod script_args;
pub mod signer;
pub mod tracker;
pub mod tx;
pub mod wallet;

pub use api::Api;
pub use error::{ApiError, FilterError, LogError, ScriptArgError, TxError};
pub use msgs::Message;
pub use script_args::{arg, ArgInput, ScriptArg, TypeTag, VectorInput};
pub use signer::{Signer, SignerOutput};
pub use tracker::Tracker;
pub use tx::{AccountState, BroadcastMode, SignedEnvelope, TxBuilder, TxParams};
pub use wallet::Wallet;
