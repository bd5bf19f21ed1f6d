//! Bulk document ingestion: upload one file and relay the server's
//! lifecycle events.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use tracing::{debug, info, warn};

use crate::abort::AbortSignal;
use crate::errors::ClientError;
use crate::frame::{Frame, IngestEvent, decode_frames};
use crate::transport::sse::record_stream;
use crate::transport::{StreamRequest, Transport, UploadPart};

/// Endpoint that accepts documents and streams processing events.
pub const PROCESS_PATH: &str = "/process/process-document";
/// Multipart field carrying the file.
pub const FILE_FIELD: &str = "file";
/// Message reported when no file location was supplied.
pub const NO_FILE_MESSAGE: &str = "No file provided";

/// File selected for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    /// Local location of the file. `None` when the picker returned nothing.
    pub uri: Option<PathBuf>,
    /// File name reported to the server.
    pub name: String,
    /// MIME type reported to the server.
    pub mime_type: String,
}

impl UploadFile {
    /// Describes a local file, deriving the name from the path.
    pub fn from_path(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Self {
            uri: Some(path),
            name,
            mime_type: mime_type.into(),
        }
    }

    /// Guesses a MIME type from the file extension (zip or pdf).
    pub fn guess_mime(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("zip") => "application/zip",
            Some("pdf") => "application/pdf",
            _ => "application/octet-stream",
        }
    }
}

/// Receives ingestion progress.
pub trait IngestSink: Send {
    /// Called for every decoded event, terminal ones included.
    fn on_status_update(&mut self, event: &IngestEvent);
    /// The upload or processing failed.
    fn on_error(&mut self, message: &str);
    /// Processing finished; carries the report location when one was sent.
    fn on_complete(&mut self, report_url: Option<&str>);
}

/// Final state of one relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    /// A completion event arrived.
    Completed { report_url: Option<String> },
    /// The upload was rejected, the stream failed, or the server sent an
    /// error event.
    Failed(String),
    /// The body ended without a terminal event; no callback was invoked.
    Unresolved,
    /// The caller cancelled the relay.
    Cancelled,
}

/// Uploads documents and relays the processing events.
pub struct IngestionRelay {
    transport: Arc<dyn Transport>,
    idle_timeout: Option<Duration>,
}

impl IngestionRelay {
    /// Creates a relay on top of a transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            idle_timeout: None,
        }
    }

    /// Sets the maximum quiet period while waiting for events.
    ///
    /// When it elapses the relay reports an error instead of waiting forever.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Uploads `file` and relays events into `sink` until a terminal event.
    pub async fn upload_bulk<S>(&self, file: &UploadFile, sink: &mut S) -> RelayOutcome
    where
        S: IngestSink + ?Sized,
    {
        self.relay(file, None, sink).await
    }

    /// Like [`Self::upload_bulk`], stopping early when `signal` fires.
    pub async fn upload_bulk_until<S>(
        &self,
        file: &UploadFile,
        signal: &mut AbortSignal,
        sink: &mut S,
    ) -> RelayOutcome
    where
        S: IngestSink + ?Sized,
    {
        self.relay(file, Some(signal), sink).await
    }

    async fn relay<S>(
        &self,
        file: &UploadFile,
        mut signal: Option<&mut AbortSignal>,
        sink: &mut S,
    ) -> RelayOutcome
    where
        S: IngestSink + ?Sized,
    {
        let Some(path) = file.uri.as_deref() else {
            sink.on_error(NO_FILE_MESSAGE);
            return RelayOutcome::Failed(NO_FILE_MESSAGE.to_string());
        };
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                let error = ClientError::Io(format!("Failed to read {}: {err}", path.display()));
                warn!(path = %path.display(), error = %error, "upload source unreadable");
                let message = error.user_message();
                sink.on_error(&message);
                return RelayOutcome::Failed(message);
            }
        };
        info!(file = %file.name, size = bytes.len(), "uploading document");

        let request = StreamRequest::multipart(
            PROCESS_PATH,
            UploadPart {
                field: FILE_FIELD.to_string(),
                file_name: file.name.clone(),
                mime_type: file.mime_type.clone(),
                bytes,
            },
        );
        let opened = match signal.as_deref_mut() {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.cancelled() => return RelayOutcome::Cancelled,
                opened = self.transport.open(request) => opened,
            },
            None => self.transport.open(request).await,
        };
        let body = match opened {
            Ok(body) => body,
            Err(err) => {
                let message = err.user_message();
                warn!(error = %err, "upload request failed");
                sink.on_error(&message);
                return RelayOutcome::Failed(message);
            }
        };

        let mut frames = decode_frames::<IngestEvent>(record_stream(body, self.idle_timeout)).boxed();
        loop {
            let next = match signal.as_deref_mut() {
                Some(signal) => tokio::select! {
                    biased;
                    _ = signal.cancelled() => return RelayOutcome::Cancelled,
                    next = frames.next() => next,
                },
                None => frames.next().await,
            };
            match next {
                Some(Ok(Frame::Payload(event))) => {
                    debug!(kind = ?event.kind(), event = ?event, "ingestion event");
                    sink.on_status_update(&event);
                    match event {
                        IngestEvent::BatchCompleted { .. } | IngestEvent::Completed { .. } => {
                            let report_url = event.report_url().map(ToOwned::to_owned);
                            sink.on_complete(report_url.as_deref());
                            return RelayOutcome::Completed { report_url };
                        }
                        IngestEvent::Error { error } | IngestEvent::FatalError { error } => {
                            let message = error
                                .filter(|e| !e.trim().is_empty())
                                .unwrap_or_else(|| "Processing failed".to_string());
                            sink.on_error(&message);
                            return RelayOutcome::Failed(message);
                        }
                        _ => {}
                    }
                }
                Some(Ok(Frame::Done)) | None => {
                    warn!(file = %file.name, "ingestion stream ended without a terminal event");
                    return RelayOutcome::Unresolved;
                }
                Some(Err(err)) => {
                    let message = err.user_message();
                    warn!(error = %err, "ingestion stream failed");
                    sink.on_error(&message);
                    return RelayOutcome::Failed(message);
                }
            }
        }
    }
}
