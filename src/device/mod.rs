//! Device access: the RPC verbs the reconciliation manager needs, and the factory that
//! opens one client per switch.

pub mod jsonrpc;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::encoder::ConfigDocument;
use crate::models::Switch;

pub use jsonrpc::{JsonRpcClient, JsonRpcConnector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datastore {
    Running,
}

impl Datastore {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datastore::Running => "running",
        }
    }
}

/// Transport-level failure. Error payloads returned by the device are not errors here;
/// they come back as the raw reply for the caller to classify.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no credentials configured for {0}")]
    MissingCredentials(String),

    #[error("request to {address} timed out")]
    Timeout { address: String },

    #[error("cannot reach {address}: {message}")]
    Transport { address: String, message: String },

    #[error("{address} answered HTTP {status}: {body}")]
    Http { address: String, status: u16, body: String },

    #[error("malformed reply from {address}: {message}")]
    Decode { address: String, message: String },
}

/// RPC verbs of one device session. Every call replaces the subtree at `path`.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    async fn get(&self, path: &str, datastore: Datastore) -> Result<Value, DeviceError>;

    async fn diff(&self, path: &str, document: &ConfigDocument) -> Result<Value, DeviceError>;

    async fn validate(&self, path: &str, document: &ConfigDocument) -> Result<Value, DeviceError>;

    async fn commit(&self, path: &str, document: &ConfigDocument) -> Result<Value, DeviceError>;
}

/// Opens a client for a switch
pub trait Connector: Send + Sync {
    fn connect(&self, switch: &Switch) -> Result<Arc<dyn DeviceClient>, DeviceError>;
}
