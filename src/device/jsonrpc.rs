use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{Connector, Datastore, DeviceClient, DeviceError};
use crate::encoder::ConfigDocument;
use crate::models::{Credentials, Switch};
use crate::utils::truncate_lines;

const ERROR_BODY_LINES: usize = 20;

/// JSON-RPC 2.0 client for the SR Linux management server
pub struct JsonRpcClient {
    url: String,
    address: String,
    credentials: Credentials,
    client: Client,
}

impl JsonRpcClient {
    pub fn new(
        address: Ipv4Addr,
        credentials: Credentials,
        scheme: &str,
        timeout: Duration,
    ) -> Result<Self, DeviceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeviceError::Transport {
                address: address.to_string(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            url: endpoint(scheme, address),
            address: address.to_string(),
            credentials,
            client,
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, DeviceError> {
        let body = request(method, params);
        tracing::debug!(address = %self.address, method, "JSON-RPC call");

        let resp = self
            .client
            .post(&self.url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DeviceError::Http {
                address: self.address.clone(),
                status,
                body: truncate_lines(&body, ERROR_BODY_LINES),
            });
        }

        resp.json::<Value>().await.map_err(|e| DeviceError::Decode {
            address: self.address.clone(),
            message: e.to_string(),
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> DeviceError {
        if e.is_timeout() {
            DeviceError::Timeout {
                address: self.address.clone(),
            }
        } else {
            DeviceError::Transport {
                address: self.address.clone(),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl DeviceClient for JsonRpcClient {
    async fn get(&self, path: &str, datastore: Datastore) -> Result<Value, DeviceError> {
        self.call("get", get_params(path, datastore)).await
    }

    async fn diff(&self, path: &str, document: &ConfigDocument) -> Result<Value, DeviceError> {
        self.call("diff", replace_params(path, document)).await
    }

    async fn validate(&self, path: &str, document: &ConfigDocument) -> Result<Value, DeviceError> {
        self.call("validate", replace_params(path, document)).await
    }

    async fn commit(&self, path: &str, document: &ConfigDocument) -> Result<Value, DeviceError> {
        self.call("set", replace_params(path, document)).await
    }
}

/// Builds a [`JsonRpcClient`] per switch from its management address and credentials
pub struct JsonRpcConnector {
    scheme: String,
    timeout: Duration,
}

impl JsonRpcConnector {
    pub fn new(scheme: impl Into<String>, timeout: Duration) -> Self {
        Self {
            scheme: scheme.into(),
            timeout,
        }
    }
}

impl Connector for JsonRpcConnector {
    fn connect(&self, switch: &Switch) -> Result<Arc<dyn DeviceClient>, DeviceError> {
        if !switch.credentials.is_complete() {
            return Err(DeviceError::MissingCredentials(switch.name.clone()));
        }
        let client = JsonRpcClient::new(
            switch.address,
            switch.credentials.clone(),
            &self.scheme,
            self.timeout,
        )?;
        Ok(Arc::new(client))
    }
}

fn endpoint(scheme: &str, address: Ipv4Addr) -> String {
    format!("{}://{}/jsonrpc", scheme, address)
}

/// Envelope of one call; the id is the current timestamp
fn request(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": chrono::Utc::now().to_rfc3339(),
        "method": method,
        "params": params,
    })
}

fn get_params(path: &str, datastore: Datastore) -> Value {
    json!({
        "commands": [{ "path": path, "datastore": datastore.as_str() }]
    })
}

fn replace_params(path: &str, document: &ConfigDocument) -> Value {
    json!({
        "commands": [{ "action": "replace", "path": path, "value": document }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        assert_eq!(
            endpoint("http", Ipv4Addr::new(172, 20, 0, 11)),
            "http://172.20.0.11/jsonrpc"
        );
        assert_eq!(
            endpoint("https", Ipv4Addr::new(10, 0, 0, 1)),
            "https://10.0.0.1/jsonrpc"
        );
    }

    #[test]
    fn test_request_envelope() {
        let body = request("diff", json!({}));
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["method"], "diff");
        let id = body["id"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(id).is_ok());
    }

    #[test]
    fn test_replace_params() {
        let mut document = ConfigDocument::new();
        document.insert("srl_nokia-interfaces:interface".to_string(), json!([]));
        let params = replace_params("/", &document);
        assert_eq!(
            params,
            json!({
                "commands": [{
                    "action": "replace",
                    "path": "/",
                    "value": {"srl_nokia-interfaces:interface": []}
                }]
            })
        );
    }

    #[test]
    fn test_get_params() {
        assert_eq!(
            get_params("/", Datastore::Running),
            json!({"commands": [{"path": "/", "datastore": "running"}]})
        );
    }

    #[test]
    fn test_connector_requires_credentials() {
        let topology = crate::loader::fixtures::sample_topology();
        let mut switch = topology.find_switch("leaf1").unwrap().clone();
        let connector = JsonRpcConnector::new("http", Duration::from_secs(5));
        assert!(connector.connect(&switch).is_ok());

        switch.credentials.password.clear();
        let err = connector.connect(&switch).err().unwrap();
        assert!(matches!(err, DeviceError::MissingCredentials(name) if name == "leaf1"));
    }

    #[tokio::test]
    async fn test_unreachable_device_is_a_transport_error() {
        let client = JsonRpcClient::new(
            Ipv4Addr::new(127, 0, 0, 1),
            Credentials {
                username: "admin".to_string(),
                password: "secret".to_string(),
            },
            "http",
            Duration::from_millis(500),
        )
        .unwrap();
        // nothing listens on port 80 of the loopback in the test environment
        let client = JsonRpcClient {
            url: "http://127.0.0.1:9/jsonrpc".to_string(),
            ..client
        };
        let err = client.get("/", Datastore::Running).await.unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Transport { .. } | DeviceError::Timeout { .. }
        ));
    }
}
