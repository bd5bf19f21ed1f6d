use futures::StreamExt as _;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{ClientConfig, DeliveryMode};
use crate::errors::{ClientError, detail_message};

use super::{ByteStream, RequestBody, ResponseBody, StreamRequest, Transport};

/// Builds the shared reqwest client for a config.
pub(crate) fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, ClientError> {
    config.validate()?;
    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))
}

/// Maps a non-2xx response to `ClientError::Http` with the server detail.
pub(crate) async fn error_from_response(response: reqwest::Response, fallback: &str) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), body = %body, "request rejected");
    ClientError::Http {
        status: status.as_u16(),
        message: detail_message(&body, fallback),
    }
}

/// Attaches the configured bearer token, if any.
pub(crate) fn with_bearer(
    request: reqwest::RequestBuilder,
    config: &ClientConfig,
) -> reqwest::RequestBuilder {
    match config.access_token.as_deref() {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Sends a request/response call and decodes its JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    fallback: &str,
) -> Result<T, ClientError> {
    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(error_from_response(response, fallback).await);
    }
    decode_json(response).await
}

/// Sends a request/response call whose body is not needed.
pub(crate) async fn send_empty(
    request: reqwest::RequestBuilder,
    fallback: &str,
) -> Result<(), ClientError> {
    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(error_from_response(response, fallback).await);
    }
    Ok(())
}

pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Checks that `value` can be used as a single URL path segment.
pub(crate) fn path_segment<'a>(what: &str, value: &'a str) -> Result<&'a str, ClientError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ClientError::Validation(format!("{what} must not be empty")));
    }
    if value
        .chars()
        .any(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace())
    {
        return Err(ClientError::Validation(format!(
            "{what} `{value}` is not a valid path segment"
        )));
    }
    Ok(value)
}

/// reqwest-backed transport for the streaming endpoints.
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Creates a transport from explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    pub(crate) fn with_client(client: reqwest::Client, config: ClientConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: StreamRequest) -> Result<ResponseBody, ClientError> {
        let url = self.config.endpoint(&request.path);
        debug!(url = %url, delivery = ?self.config.delivery, "opening event stream");

        let http_req = with_bearer(self.client.post(&url), &self.config);
        let http_req = match request.body {
            RequestBody::Json(body) => http_req.json(&body),
            RequestBody::Multipart(part) => {
                let file = reqwest::multipart::Part::bytes(part.bytes)
                    .file_name(part.file_name)
                    .mime_str(&part.mime_type)
                    .map_err(|e| {
                        ClientError::Validation(format!(
                            "invalid mime type `{}`: {e}",
                            part.mime_type
                        ))
                    })?;
                http_req.multipart(reqwest::multipart::Form::new().part(part.field, file))
            }
        };

        let response = http_req
            .send()
            .await
            .map_err(|e| ClientError::transport(format!("request to {url} failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let fallback = format!("Request failed with status {status}");
            return Err(error_from_response(response, &fallback).await);
        }

        match self.config.delivery {
            DeliveryMode::Streamed => {
                let bytes_stream: ByteStream = Box::pin(response.bytes_stream().map(|chunk| {
                    chunk.map_err(|e| ClientError::transport(format!("stream read failed: {e}")))
                }));
                Ok(ResponseBody::Streamed(bytes_stream))
            }
            DeliveryMode::Buffered => {
                let text = response
                    .text()
                    .await
                    .map_err(|e| ClientError::transport(format!("body read failed: {e}")))?;
                Ok(ResponseBody::Buffered(text))
            }
        }
    }
}
