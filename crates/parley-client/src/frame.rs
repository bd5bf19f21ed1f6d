//! Typed event frames decoded from `data:` records.

use futures::StreamExt as _;
use futures::future;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::errors::ClientError;
use crate::transport::{Record, RecordStream};

/// Kind tag of a decoded frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Fragment of assistant text.
    ContentChunk,
    /// Server allocated a conversation id.
    ThreadAssigned,
    /// Ingestion job lifecycle change.
    LifecycleStatus,
    /// One ingested file finished.
    FileProgress,
    /// Final counts of a batch or single-file job.
    BatchSummary,
    /// Server-reported failure.
    Error,
    /// Done sentinel.
    Done,
}

/// A decoded record: either a payload or the done sentinel.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame<P> {
    /// Structured payload.
    Payload(P),
    /// No further frames follow.
    Done,
}

/// Payload of the chat send and edit streams.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
pub struct ChatPayload {
    /// Text fragment to append to the reply.
    #[serde(default)]
    pub content: Option<String>,
    /// Conversation id allocated by the server.
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Server-side failure message.
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatPayload {
    /// Returns the dominant kind of this payload.
    pub fn kind(&self) -> Option<FrameKind> {
        if self.error.is_some() {
            Some(FrameKind::Error)
        } else if self.content.as_deref().is_some_and(|c| !c.is_empty()) {
            Some(FrameKind::ContentChunk)
        } else if self.thread_id.is_some() {
            Some(FrameKind::ThreadAssigned)
        } else {
            None
        }
    }
}

/// Processed/failed counts reported at the end of a batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
pub struct BatchStats {
    #[serde(default)]
    pub processed: u64,
    #[serde(default)]
    pub failed: u64,
}

/// Lifecycle event of the document ingestion stream, tagged by `event`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IngestEvent {
    Initialized {
        #[serde(default)]
        job_id: Option<String>,
    },
    UploadComplete {},
    ProcessingStarted {},
    BatchStart {
        #[serde(default)]
        total_files: u64,
    },
    FileFinished {
        #[serde(default)]
        filename: Option<String>,
    },
    BatchCompleted {
        #[serde(default)]
        stats: Option<BatchStats>,
        #[serde(default)]
        master_report_url: Option<String>,
    },
    /// Single-file variant of `batch_completed`.
    Completed {
        #[serde(default)]
        report_url: Option<String>,
    },
    Error {
        #[serde(default)]
        error: Option<String>,
    },
    FatalError {
        #[serde(default)]
        error: Option<String>,
    },
    /// Any event name this client does not know.
    #[serde(other)]
    Other,
}

impl IngestEvent {
    /// Returns the kind tag of this event.
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Initialized { .. }
            | Self::UploadComplete {}
            | Self::ProcessingStarted {}
            | Self::BatchStart { .. }
            | Self::Other => FrameKind::LifecycleStatus,
            Self::FileFinished { .. } => FrameKind::FileProgress,
            Self::BatchCompleted { .. } | Self::Completed { .. } => FrameKind::BatchSummary,
            Self::Error { .. } | Self::FatalError { .. } => FrameKind::Error,
        }
    }

    /// Returns true for events after which the server sends nothing relevant.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::BatchCompleted { .. }
                | Self::Completed { .. }
                | Self::Error { .. }
                | Self::FatalError { .. }
        )
    }

    /// Report location carried by a completion event.
    pub fn report_url(&self) -> Option<&str> {
        match self {
            Self::BatchCompleted {
                master_report_url, ..
            } => master_report_url.as_deref(),
            Self::Completed { report_url } => report_url.as_deref(),
            _ => None,
        }
    }
}

/// Decodes records into typed frames.
///
/// Records whose payload is not valid for `P` are dropped with a warning;
/// read errors are passed through.
pub(crate) fn decode_frames<P>(
    records: RecordStream,
) -> impl futures::Stream<Item = Result<Frame<P>, ClientError>> + Send
where
    P: DeserializeOwned + Send + 'static,
{
    records.filter_map(|record| {
        future::ready(match record {
            Ok(Record::Done) => Some(Ok(Frame::Done)),
            Ok(Record::Data(raw)) => match serde_json::from_str::<P>(&raw) {
                Ok(payload) => Some(Ok(Frame::Payload(payload))),
                Err(err) => {
                    warn!(error = %err, record = %raw, "dropping malformed event record");
                    None
                }
            },
            Err(err) => Some(Err(err)),
        })
    })
}
