//! Client library for a conversational assistant backend that streams
//! replies and bulk-ingestion progress as `data:` records.
//!
//! # Streaming a reply
//!
//! ```no_run
//! use parley_client::prelude::*;
//!
//! struct Print;
//!
//! impl ChatSink for Print {
//!     fn on_chunk(&mut self, text: &str, _thread_id: Option<&str>) {
//!         println!("{text}");
//!     }
//!     fn on_error(&mut self, message: &str) {
//!         eprintln!("error: {message}");
//!     }
//!     fn on_complete(&mut self) {}
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let client = Client::new(ClientConfig::default().access_token("token"))?;
//! let outcome = client.chat().send_message("Hello", None, &mut Print).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

/// Cancellation handle and signal for in-flight streams.
pub mod abort;
/// Login, signup and profile endpoints.
pub mod auth;
/// Chat send/edit stream consumer and its sink contract.
pub mod chat;
/// Client entry point.
pub mod client;
/// Client configuration and delivery strategy.
pub mod config;
/// Uploaded document and generated report listings.
pub mod documents;
/// Public error type and server error-detail extraction.
pub mod errors;
/// Typed payloads decoded from event records.
pub mod frame;
/// Stored conversations.
pub mod history;
/// Bulk document ingestion relay.
pub mod ingest;
/// Process-wide logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// In-memory conversation transcript.
pub mod transcript;
/// HTTP transport seam and the record parser.
pub mod transport;
/// Progress view of a bulk upload.
pub mod upload_job;

pub use abort::{AbortHandle, AbortSignal, abort_pair};
pub use auth::{AuthClient, AuthResponse, ProfileUpdate, Signup, UserData};
pub use chat::{ChatSink, ChatStreamer, StreamOutcome};
pub use client::Client;
pub use config::{ClientConfig, DeliveryMode};
pub use documents::{DocumentsClient, FileListing};
pub use errors::ClientError;
pub use frame::{BatchStats, ChatPayload, Frame, FrameKind, IngestEvent};
pub use history::{ChatSession, HistoryClient};
pub use ingest::{IngestSink, IngestionRelay, RelayOutcome, UploadFile};
pub use transcript::{Message, Role, Transcript, TranscriptSink};
pub use transport::{HttpTransport, Record, ResponseBody, StreamRequest, Transport, UploadPart};
pub use upload_job::UploadJob;
