//! Zabbix JSON-RPC client
//!
//! Talks to `<frontend>/api_jsonrpc.php`. A session token is obtained with
//! `user.login` and sent as a bearer token on every following call.
//!
//! ## Calls used
//!
//! - `host.get` with `output: [hostid, host]`
//! - `item.get` restricted to one host and to monitored items
//! - `history.get` for one item and window, sorted by clock ascending

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

use super::error::{SourceError, SourceResult};
use super::raw::{RawHost, RawItem, RawSample};
use super::MonitoringSource;
use crate::ValueKind;
use crate::config::SourceConfig;

const JSON_RPC_PATH: &str = "api_jsonrpc.php";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    data: Option<String>,
}

/// Monitoring source backed by the Zabbix API
pub struct ZabbixClient {
    /// HTTP client (reused across requests)
    client: reqwest::Client,

    /// Full URL of the JSON-RPC endpoint
    endpoint: String,

    user: String,
    password: String,

    /// Session token from the last successful login
    token: RwLock<Option<String>>,

    request_id: AtomicU64,
}

impl ZabbixClient {
    pub fn new(config: &SourceConfig) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SourceError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: Self::endpoint_for(&config.url),
            user: config.user.clone(),
            password: config.password.clone(),
            token: RwLock::new(None),
            request_id: AtomicU64::new(1),
        })
    }

    /// Resolve the JSON-RPC endpoint from a frontend URL
    fn endpoint_for(url: &str) -> String {
        let url = url.trim_end_matches('/');
        if url.ends_with(JSON_RPC_PATH) {
            url.to_string()
        } else {
            format!("{url}/{JSON_RPC_PATH}")
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Perform a single JSON-RPC call
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        token: Option<&str>,
    ) -> SourceResult<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
        };

        trace!("calling {method}");

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let body: RpcResponse<T> = response.json().await?;

        match (body.result, body.error) {
            (_, Some(error)) => Err(SourceError::Api {
                code: error.code,
                message: error.message,
                data: error.data,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(SourceError::InvalidResponse(format!(
                "{method}: neither result nor error in response"
            ))),
        }
    }

    /// Call an authenticated method, logging in first if there is no session
    async fn call_authenticated<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> SourceResult<T> {
        let existing = self.token.read().await.clone();
        let token = match existing {
            Some(token) => token,
            None => self.login().await?,
        };
        self.call(method, params, Some(&token)).await
    }

    async fn login(&self) -> SourceResult<String> {
        let token: String = self
            .call(
                "user.login",
                json!({ "username": self.user, "password": self.password }),
                None,
            )
            .await
            .map_err(|e| match e {
                SourceError::Api { message, data, .. } => {
                    SourceError::AuthenticationFailed(data.unwrap_or(message))
                }
                other => other,
            })?;

        *self.token.write().await = Some(token.clone());
        debug!("logged in to {} as {}", self.endpoint, self.user);
        Ok(token)
    }
}

#[async_trait]
impl MonitoringSource for ZabbixClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn authenticate(&self) -> SourceResult<()> {
        self.login().await.map(|_| ())
    }

    #[instrument(skip(self))]
    async fn list_hosts(&self) -> SourceResult<Vec<RawHost>> {
        self.call_authenticated("host.get", json!({ "output": ["hostid", "host"] }))
            .await
    }

    #[instrument(skip(self))]
    async fn list_items(&self, host_id: &str) -> SourceResult<Vec<RawItem>> {
        self.call_authenticated(
            "item.get",
            json!({
                "hostids": [host_id],
                "output": ["itemid", "name", "key_", "hostid", "value_type"],
                "monitored": true,
            }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn history(
        &self,
        item_id: &str,
        kind: ValueKind,
        from: i64,
        till: i64,
    ) -> SourceResult<Vec<RawSample>> {
        self.call_authenticated(
            "history.get",
            json!({
                "itemids": [item_id],
                "history": kind.code(),
                "time_from": from,
                "time_till": till,
                "output": "extend",
                "sortfield": "clock",
                "sortorder": "ASC",
            }),
        )
        .await
    }
}
