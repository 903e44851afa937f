//! Wire transport between the client orchestrator, the route server, and
//! object storage.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use uplink_core::{UploadError, UploadResult};

/// Called with `(loaded, total)` after each chunk of a direct transfer
/// leaves the client.
pub type ProgressSink = Arc<dyn Fn(u64, u64) + Send + Sync>;

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// The two network legs of an upload: JSON calls to the route endpoint and
/// raw PUTs against signed storage URLs. Swappable so the orchestrator can
/// be exercised without sockets.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a protocol request to the route endpoint and return the
    /// response body as JSON.
    async fn call(
        &self,
        endpoint: &str,
        route: &str,
        action: &str,
        body: Value,
    ) -> UploadResult<Value>;

    /// PUT file content against a signed storage URL, reporting progress
    /// per chunk and honoring cancellation.
    async fn put_signed(
        &self,
        url: &str,
        content_type: &str,
        content: Bytes,
        progress: ProgressSink,
        cancel: CancellationToken,
    ) -> UploadResult<()>;
}

/// `Transport` over reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        endpoint: &str,
        route: &str,
        action: &str,
        body: Value,
    ) -> UploadResult<Value> {
        let response = self
            .client
            .post(endpoint)
            .query(&[("route", route), ("action", action)])
            .json(&body)
            .send()
            .await
            .map_err(|e| UploadError::transfer(format!("endpoint unreachable: {e}")))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| UploadError::protocol(format!("malformed endpoint response: {e}")))?;

        if status.is_success() {
            Ok(payload)
        } else {
            // Batch-level failures arrive as `{"error": {code, message}}`.
            let detail = payload.get("error").unwrap_or(&Value::Null);
            let code = detail
                .get("code")
                .and_then(Value::as_str)
                .unwrap_or("transfer_failed");
            let message = detail
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("upload endpoint returned an error");
            Err(match code {
                "route_not_found" => UploadError::route_not_found(message),
                "authorization_failed" => UploadError::authorization(message),
                "configuration_error" => UploadError::configuration(message),
                "protocol_error" => UploadError::protocol(message),
                _ => UploadError::transfer(message),
            })
        }
    }

    async fn put_signed(
        &self,
        url: &str,
        content_type: &str,
        content: Bytes,
        progress: ProgressSink,
        cancel: CancellationToken,
    ) -> UploadResult<()> {
        let total = content.len() as u64;
        let stream = async_stream::stream! {
            let mut remaining = content;
            let mut loaded = 0u64;
            while !remaining.is_empty() {
                let take = remaining.len().min(UPLOAD_CHUNK_SIZE);
                let chunk = remaining.split_to(take);
                loaded += chunk.len() as u64;
                progress(loaded, total);
                yield Ok::<Bytes, std::io::Error>(chunk);
            }
        };

        let request = self
            .client
            .put(url)
            .header("content-type", content_type.to_string())
            .header("content-length", total)
            .body(reqwest::Body::wrap_stream(stream));

        let response = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(UploadError::transfer("transfer canceled"));
            }
            result = request.send() => result
                .map_err(|e| UploadError::transfer(format!("storage PUT failed: {e}")))?,
        };

        if response.status().is_success() {
            Ok(())
        } else {
            Err(UploadError::transfer(format!(
                "storage rejected the transfer with status {}",
                response.status().as_u16()
            )))
        }
    }
}
