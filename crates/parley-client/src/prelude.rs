//! Common imports for typical client usage.
pub use crate::{
    AbortHandle, ChatSession, ChatSink, ChatStreamer, Client, ClientConfig, ClientError,
    DeliveryMode, FileListing, IngestEvent, IngestSink, RelayOutcome, StreamOutcome, Transcript,
    UploadFile, UploadJob,
};
