//! Transport seam between the streaming components and HTTP.
//!
//! [`Transport`] opens a request and hands back a [`ResponseBody`]; whether
//! that body is streamed or buffered decides which record strategy is used.
pub(crate) mod http;
pub mod sse;

use std::pin::Pin;

pub use http::HttpTransport;
pub use sse::{DATA_PREFIX, DONE_SENTINEL, EventDecoder, Record, RecordStream, parse_body};

use crate::errors::ClientError;

/// Body chunks of a streamed response.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, ClientError>> + Send + 'static>>;

/// Response body of a successfully opened request.
pub enum ResponseBody {
    /// Chunks are delivered as they arrive.
    Streamed(ByteStream),
    /// The whole body has already been read.
    Buffered(String),
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Streamed(_) => f.write_str("ResponseBody::Streamed(..)"),
            Self::Buffered(text) => f.debug_tuple("ResponseBody::Buffered").field(text).finish(),
        }
    }
}

/// A single file sent as one multipart part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadPart {
    /// Multipart field name.
    pub field: String,
    /// File name reported to the server.
    pub file_name: String,
    /// MIME type of the content.
    pub mime_type: String,
    /// File content.
    pub bytes: Vec<u8>,
}

/// Request body for a streaming endpoint.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// JSON object body.
    Json(serde_json::Value),
    /// Multipart body with a single file part.
    Multipart(UploadPart),
}

/// POST request against a streaming endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamRequest {
    /// Path relative to the configured base URL.
    pub path: String,
    /// Request body.
    pub body: RequestBody,
}

impl StreamRequest {
    /// Creates a JSON request.
    pub fn json(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            path: path.into(),
            body: RequestBody::Json(body),
        }
    }

    /// Creates a multipart request.
    pub fn multipart(path: impl Into<String>, part: UploadPart) -> Self {
        Self {
            path: path.into(),
            body: RequestBody::Multipart(part),
        }
    }
}

/// Opens requests against streaming endpoints.
///
/// Implementations return `ClientError::Http` for non-2xx responses with the
/// server detail already extracted.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns its body once the status is known.
    async fn open(&self, request: StreamRequest) -> Result<ResponseBody, ClientError>;
}
