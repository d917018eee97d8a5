use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::gateway::{
    BatchResponse, DeleteParams, FetchParams, FetchResponse, RecordClient, RecordClientError,
    RecordClientFuture, RecordOperation, RecordResponse, WriteParams,
};
use crate::config::{ConfigError, RecordClientConfig};

pub const PROJECT_ID_HEADER: &str = "x-apper-project-id";
pub const PUBLIC_KEY_HEADER: &str = "x-apper-public-key";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// `RecordClient` speaking JSON over HTTP. Every call is attempted once.
#[derive(Clone)]
pub struct HttpRecordClient {
    client: reqwest::Client,
    config: RecordClientConfig,
}

impl HttpRecordClient {
    pub fn new(config: RecordClientConfig) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RecordClientConfig {
        &self.config
    }

    fn records_url(&self, table: &str) -> String {
        format!("{}/tables/{table}/records", self.config.api_url)
    }

    async fn send<B, R>(
        &self,
        operation: RecordOperation,
        method: Method,
        url: String,
        body: &B,
    ) -> Result<R, RecordClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request_id = Uuid::new_v4().to_string();
        debug!(%operation, %url, %request_id, "sending record request");

        let response = self
            .client
            .request(method, &url)
            .header(PROJECT_ID_HEADER, &self.config.project_id)
            .header(PUBLIC_KEY_HEADER, &self.config.public_key)
            .header(REQUEST_ID_HEADER, &request_id)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    RecordClientError::Timeout { operation }
                } else {
                    RecordClientError::Transport {
                        operation,
                        message: err.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| RecordClientError::Transport {
                operation,
                message: format!("response_body_read_failed: {err}"),
            })?;
        debug!(%operation, %request_id, status = status.as_u16(), "record response received");

        if !status.is_success() {
            return Err(RecordClientError::Rejected {
                operation,
                status: status.as_u16(),
                message: parse_error_message(&body),
            });
        }

        serde_json::from_str::<R>(&body).map_err(|err| RecordClientError::InvalidPayload {
            operation,
            message: err.to_string(),
        })
    }
}

impl RecordClient for HttpRecordClient {
    fn fetch_records<'a>(
        &'a self,
        table: &'a str,
        params: FetchParams,
    ) -> RecordClientFuture<'a, FetchResponse> {
        Box::pin(async move {
            let url = format!("{}/query", self.records_url(table));
            self.send(RecordOperation::Fetch, Method::POST, url, &params)
                .await
        })
    }

    fn get_record_by_id<'a>(
        &'a self,
        table: &'a str,
        id: i64,
        params: FetchParams,
    ) -> RecordClientFuture<'a, RecordResponse> {
        Box::pin(async move {
            let url = format!("{}/{id}/query", self.records_url(table));
            self.send(RecordOperation::GetById, Method::POST, url, &params)
                .await
        })
    }

    fn create_records<'a>(
        &'a self,
        table: &'a str,
        params: WriteParams,
    ) -> RecordClientFuture<'a, BatchResponse> {
        Box::pin(async move {
            self.send(
                RecordOperation::Create,
                Method::POST,
                self.records_url(table),
                &params,
            )
            .await
        })
    }

    fn update_records<'a>(
        &'a self,
        table: &'a str,
        params: WriteParams,
    ) -> RecordClientFuture<'a, BatchResponse> {
        Box::pin(async move {
            self.send(
                RecordOperation::Update,
                Method::PATCH,
                self.records_url(table),
                &params,
            )
            .await
        })
    }

    fn delete_records<'a>(
        &'a self,
        table: &'a str,
        params: DeleteParams,
    ) -> RecordClientFuture<'a, BatchResponse> {
        Box::pin(async move {
            self.send(
                RecordOperation::Delete,
                Method::DELETE,
                self.records_url(table),
                &params,
            )
            .await
        })
    }
}

fn parse_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<Value>(body).ok()?;
    let message = parsed
        .get("message")
        .or_else(|| parsed.get("error").and_then(|error| error.get("message")))?;

    match message {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => None,
    }
}
