use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::chain::{quantity, TxReceipt};
use crate::error::{AppError, AppResult, ChainError};

/// Core-space JSON-RPC client configuration
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub url: String,
    /// Node-managed account every transaction is sent from
    pub operator: String,
    pub request_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub receipt_timeout: Duration,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC transport to a core-space node.
///
/// Owns transaction sequencing for the operator account: submissions are
/// serialized through `submit_lock` and each one is held until its receipt is
/// available, so no two transactions from the operator are ever in flight.
pub struct JsonRpcClient {
    config: RpcConfig,
    http: reqwest::Client,
    next_id: AtomicU64,
    submit_lock: Mutex<()>,
}

impl JsonRpcClient {
    pub fn new(config: RpcConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            config,
            http,
            next_id: AtomicU64::new(1),
            submit_lock: Mutex::new(()),
        })
    }

    /// Issue a request; a JSON `null` result comes back as `None`
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> AppResult<Option<T>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(id, method, "rpc request");

        let response: RpcResponse = self
            .http
            .post(&self.config.url)
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_response(method, response)
    }

    /// Issue a request whose result must not be `null`
    pub async fn request_required<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> AppResult<T> {
        self.request(method, params).await?.ok_or_else(|| {
            ChainError::MissingResult {
                method: method.to_string(),
            }
            .into()
        })
    }

    /// Read-only contract call against the latest state
    pub async fn call(&self, to: &str, data: &[u8]) -> AppResult<Vec<u8>> {
        let raw: String = self
            .request_required(
                "cfx_call",
                json!([{ "to": to, "data": to_hex(data) }, "latest_state"]),
            )
            .await?;
        from_hex(&raw)
    }

    /// Native balance of `address` in drip
    pub async fn get_balance(&self, address: &str) -> AppResult<u128> {
        let raw: String = self
            .request_required("cfx_getBalance", json!([address, "latest_state"]))
            .await?;
        quantity::parse(&raw).map_err(AppError::Decode)
    }

    /// Submit a contract transaction from the operator account and wait until
    /// it has been executed
    #[instrument(skip(self, data))]
    pub async fn send_and_wait(&self, to: &str, data: Vec<u8>) -> AppResult<TxReceipt> {
        let _guard = self.submit_lock.lock().await;

        let tx_hash: String = self
            .request_required(
                "cfx_sendTransaction",
                json!([{ "from": self.config.operator, "to": to, "data": to_hex(&data) }]),
            )
            .await?;
        info!(tx_hash = %tx_hash, "📤 Transaction submitted, waiting for execution");

        self.wait_for_receipt(&tx_hash).await
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> AppResult<TxReceipt> {
        let poll = async {
            loop {
                match self
                    .request::<TxReceipt>("cfx_getTransactionReceipt", json!([tx_hash]))
                    .await
                {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => warn!(tx_hash, "Receipt poll failed, retrying: {}", e),
                }
                tokio::time::sleep(self.config.receipt_poll_interval).await;
            }
        };

        tokio::time::timeout(self.config.receipt_timeout, poll)
            .await
            .map_err(|_| {
                ChainError::ReceiptTimeout {
                    tx_hash: tx_hash.to_string(),
                }
                .into()
            })
    }
}

fn parse_response<T: DeserializeOwned>(method: &str, response: RpcResponse) -> AppResult<Option<T>> {
    if let Some(error) = response.error {
        return Err(ChainError::Rpc {
            method: method.to_string(),
            code: error.code,
            message: error.message,
        }
        .into());
    }

    match response.result {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
    }
}

pub fn to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

pub fn from_hex(raw: &str) -> AppResult<Vec<u8>> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    Ok(hex::decode(stripped)?)
}
