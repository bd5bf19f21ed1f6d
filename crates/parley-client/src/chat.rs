//! Message stream consumer for the chat send and edit endpoints.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::StreamExt as _;
use tracing::{debug, warn};

use crate::abort::{AbortHandle, AbortSignal, abort_pair};
use crate::errors::ClientError;
use crate::frame::{ChatPayload, Frame, decode_frames};
use crate::transport::sse::record_stream;
use crate::transport::{StreamRequest, Transport};

/// Endpoint that streams the reply to a new user message.
pub const SEND_PATH: &str = "/chat/message/stream";
/// Endpoint that regenerates the reply after an edited user message.
pub const EDIT_PATH: &str = "/chat/message/edit";

/// Receives the progress of one chat stream.
///
/// Callbacks fire on the streaming task in frame order. `on_chunk` always
/// receives the whole reply assembled so far, so implementations replace
/// their displayed text rather than append to it.
pub trait ChatSink: Send {
    /// Reply text so far, plus a conversation id the first time the server
    /// assigns one.
    fn on_chunk(&mut self, text: &str, thread_id: Option<&str>);
    /// The stream failed; no further callbacks follow.
    fn on_error(&mut self, message: &str);
    /// The stream finished normally.
    fn on_complete(&mut self);
    /// The stream was cancelled; runs instead of `on_complete`.
    fn on_cancelled(&mut self) {}
}

/// Final state of one chat stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Done sentinel or end of body reached.
    Completed {
        text: String,
        thread_id: Option<String>,
    },
    /// Transport failure or server error frame. `partial` is the text that
    /// had already been delivered.
    Failed { message: String, partial: String },
    /// The caller cancelled, or a newer stream replaced this one.
    Cancelled,
}

impl StreamOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StreamKind {
    Send,
    Edit,
}

#[derive(Default)]
struct ActiveSlot {
    generation: u64,
    handle: Option<AbortHandle>,
}

/// Drives chat streams, keeping at most one active per instance.
///
/// Starting a stream cancels the one already in flight. Share the streamer
/// (for example behind an `Arc`) to cancel from another task.
pub struct ChatStreamer {
    transport: Arc<dyn Transport>,
    idle_timeout: Option<Duration>,
    active: Mutex<ActiveSlot>,
}

impl ChatStreamer {
    /// Creates a streamer on top of a transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            idle_timeout: None,
            active: Mutex::new(ActiveSlot::default()),
        }
    }

    /// Sets the maximum quiet period while reading a reply.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sends a user message and streams the assistant reply into `sink`.
    ///
    /// With `thread_id` unset the server allocates a conversation and reports
    /// it through the first `on_chunk` that carries an id.
    pub async fn send_message<S>(
        &self,
        content: &str,
        thread_id: Option<&str>,
        sink: &mut S,
    ) -> Result<StreamOutcome, ClientError>
    where
        S: ChatSink + ?Sized,
    {
        if content.trim().is_empty() {
            return Err(ClientError::Validation(
                "message content must not be empty".into(),
            ));
        }
        let thread_id = thread_id.map(str::trim).filter(|id| !id.is_empty());
        let request = StreamRequest::json(
            SEND_PATH,
            serde_json::json!({
                "message": content,
                "thread_id": thread_id,
            }),
        );
        Ok(self
            .drive(request, StreamKind::Send, thread_id.map(ToOwned::to_owned), sink)
            .await)
    }

    /// Replaces the content of a user message and streams the regenerated
    /// reply into `sink`.
    ///
    /// Only content chunks and the done sentinel are honoured. Truncating the
    /// local transcript is the caller's job (see
    /// [`crate::Transcript::begin_edit`]).
    pub async fn edit_message<S>(
        &self,
        message_id: &str,
        new_content: &str,
        sink: &mut S,
    ) -> Result<StreamOutcome, ClientError>
    where
        S: ChatSink + ?Sized,
    {
        if message_id.trim().is_empty() {
            return Err(ClientError::Validation("message id must not be empty".into()));
        }
        if new_content.trim().is_empty() {
            return Err(ClientError::Validation(
                "message content must not be empty".into(),
            ));
        }
        let request = StreamRequest::json(
            EDIT_PATH,
            serde_json::json!({
                "message_id": message_id.trim(),
                "new_content": new_content,
            }),
        );
        Ok(self.drive(request, StreamKind::Edit, None, sink).await)
    }

    /// Cancels the active stream. Returns false when nothing was streaming.
    pub fn cancel(&self) -> bool {
        let mut slot = self.lock_slot();
        match slot.handle.take() {
            Some(handle) => {
                debug!(generation = slot.generation, "cancelling chat stream");
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Returns true while a stream is in flight.
    pub fn is_streaming(&self) -> bool {
        self.lock_slot().handle.is_some()
    }

    /// Returns a handle that cancels the stream currently in flight.
    pub fn abort_handle(&self) -> Option<AbortHandle> {
        self.lock_slot().handle.clone()
    }

    fn lock_slot(&self) -> MutexGuard<'_, ActiveSlot> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> ActiveGuard<'_> {
        let (handle, signal) = abort_pair();
        let mut slot = self.lock_slot();
        if let Some(previous) = slot.handle.replace(handle) {
            debug!(generation = slot.generation, "replacing in-flight chat stream");
            previous.abort();
        }
        slot.generation = slot.generation.wrapping_add(1);
        ActiveGuard {
            streamer: self,
            generation: slot.generation,
            signal,
        }
    }

    async fn drive<S>(
        &self,
        request: StreamRequest,
        kind: StreamKind,
        known_thread: Option<String>,
        sink: &mut S,
    ) -> StreamOutcome
    where
        S: ChatSink + ?Sized,
    {
        let mut guard = self.begin();
        debug!(generation = guard.generation, path = %request.path, ?kind, "starting chat stream");
        let outcome = self
            .consume(request, kind, known_thread, &mut guard.signal, sink)
            .await;
        debug!(generation = guard.generation, outcome = outcome.label(), "chat stream finished");
        outcome
    }

    async fn consume<S>(
        &self,
        request: StreamRequest,
        kind: StreamKind,
        known_thread: Option<String>,
        signal: &mut AbortSignal,
        sink: &mut S,
    ) -> StreamOutcome
    where
        S: ChatSink + ?Sized,
    {
        let opened = tokio::select! {
            biased;
            _ = signal.cancelled() => None,
            opened = self.transport.open(request) => Some(opened),
        };
        let Some(opened) = opened else {
            sink.on_cancelled();
            return StreamOutcome::Cancelled;
        };
        let body = match opened {
            Ok(body) => body,
            Err(err) => {
                let message = err.user_message();
                warn!(error = %err, "chat request failed");
                sink.on_error(&message);
                return StreamOutcome::Failed {
                    message,
                    partial: String::new(),
                };
            }
        };

        let mut frames = decode_frames::<ChatPayload>(record_stream(body, self.idle_timeout)).boxed();
        let mut reply = Reply::new(kind, known_thread);
        loop {
            let next = tokio::select! {
                biased;
                _ = signal.cancelled() => {
                    sink.on_cancelled();
                    return StreamOutcome::Cancelled;
                }
                next = frames.next() => next,
            };
            match next {
                Some(Ok(Frame::Payload(payload))) => {
                    if let Some(message) = reply.apply(payload, sink) {
                        return StreamOutcome::Failed {
                            message,
                            partial: reply.text,
                        };
                    }
                }
                Some(Ok(Frame::Done)) | None => {
                    sink.on_complete();
                    return StreamOutcome::Completed {
                        text: reply.text,
                        thread_id: reply.thread_id,
                    };
                }
                Some(Err(err)) => {
                    let message = err.user_message();
                    warn!(error = %err, "chat stream read failed");
                    sink.on_error(&message);
                    return StreamOutcome::Failed {
                        message,
                        partial: reply.text,
                    };
                }
            }
        }
    }
}

struct ActiveGuard<'a> {
    streamer: &'a ChatStreamer,
    generation: u64,
    signal: AbortSignal,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.streamer.lock_slot();
        if slot.generation == self.generation {
            slot.handle = None;
        }
    }
}

/// Reply assembled from content chunks.
struct Reply {
    kind: StreamKind,
    text: String,
    thread_id: Option<String>,
    thread_surfaced: bool,
}

impl Reply {
    fn new(kind: StreamKind, known_thread: Option<String>) -> Self {
        Self {
            kind,
            text: String::new(),
            thread_id: known_thread,
            thread_surfaced: false,
        }
    }

    /// Applies one payload; returns the error message when the server
    /// reported a failure.
    fn apply<S: ChatSink + ?Sized>(&mut self, payload: ChatPayload, sink: &mut S) -> Option<String> {
        if payload.kind().is_none() {
            debug!("skipping chat frame without content, thread or error");
            return None;
        }
        let assigned = match self.kind {
            StreamKind::Send => payload
                .thread_id
                .filter(|id| !id.trim().is_empty())
                .and_then(|id| self.assign_thread(id)),
            StreamKind::Edit => None,
        };

        if let Some(fragment) = payload.content.filter(|c| !c.is_empty()) {
            self.text.push_str(&fragment);
            sink.on_chunk(&self.text, assigned.as_deref());
        } else if let Some(id) = assigned.as_deref() {
            sink.on_chunk(&self.text, Some(id));
        }

        let error = payload.error?;
        if self.kind == StreamKind::Edit {
            warn!(error = %error, "ignoring error field in edit stream");
            return None;
        }
        let message = if error.trim().is_empty() {
            "Unknown server error".to_string()
        } else {
            error
        };
        sink.on_error(&message);
        Some(message)
    }

    fn assign_thread(&mut self, id: String) -> Option<String> {
        if self.thread_surfaced {
            return None;
        }
        self.thread_surfaced = true;
        if self.thread_id.as_deref() == Some(id.as_str()) {
            return None;
        }
        debug!(thread_id = %id, "server assigned conversation");
        self.thread_id = Some(id.clone());
        Some(id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transport::{ByteStream, RequestBody, ResponseBody};
    use futures::stream;
    use std::collections::VecDeque;

    pub(crate) enum Behavior {
        Chunks(Vec<String>),
        ChunksThenPending(Vec<String>),
        Buffered(String),
        ReadError(Vec<String>, ClientError),
        Fail(ClientError),
        PendingOpen,
    }

    #[derive(Default)]
    pub(crate) struct FakeTransport {
        behaviors: Mutex<VecDeque<Behavior>>,
        requests: Mutex<Vec<StreamRequest>>,
    }

    impl FakeTransport {
        pub(crate) fn new(behaviors: Vec<Behavior>) -> Arc<Self> {
            Arc::new(Self {
                behaviors: Mutex::new(behaviors.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn requests(&self) -> Vec<StreamRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn byte_stream(chunks: Vec<String>) -> ByteStream {
        Box::pin(stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(bytes::Bytes::from(c)))
                .collect::<Vec<_>>(),
        ))
    }

    #[async_trait::async_trait]
    impl Transport for FakeTransport {
        async fn open(&self, request: StreamRequest) -> Result<ResponseBody, ClientError> {
            let behavior = {
                self.requests.lock().unwrap().push(request);
                self.behaviors
                    .lock()
                    .unwrap()
                    .pop_front()
                    .expect("unexpected request")
            };
            match behavior {
                Behavior::Chunks(chunks) => Ok(ResponseBody::Streamed(byte_stream(chunks))),
                Behavior::ChunksThenPending(chunks) => Ok(ResponseBody::Streamed(Box::pin(
                    byte_stream(chunks).chain(stream::pending()),
                ))),
                Behavior::Buffered(body) => Ok(ResponseBody::Buffered(body)),
                Behavior::ReadError(chunks, err) => Ok(ResponseBody::Streamed(Box::pin(
                    byte_stream(chunks).chain(stream::iter(vec![Err(err)])),
                ))),
                Behavior::Fail(err) => Err(err),
                Behavior::PendingOpen => std::future::pending().await,
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum SinkEvent {
        Chunk(String, Option<String>),
        Error(String),
        Complete,
        Cancelled,
    }

    #[derive(Clone, Default)]
    pub(crate) struct RecordingSink {
        events: Arc<Mutex<Vec<SinkEvent>>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<SinkEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ChatSink for RecordingSink {
        fn on_chunk(&mut self, text: &str, thread_id: Option<&str>) {
            self.events
                .lock()
                .unwrap()
                .push(SinkEvent::Chunk(text.into(), thread_id.map(Into::into)));
        }

        fn on_error(&mut self, message: &str) {
            self.events.lock().unwrap().push(SinkEvent::Error(message.into()));
        }

        fn on_complete(&mut self) {
            self.events.lock().unwrap().push(SinkEvent::Complete);
        }

        fn on_cancelled(&mut self) {
            self.events.lock().unwrap().push(SinkEvent::Cancelled);
        }
    }

    fn chunk(text: &str) -> SinkEvent {
        SinkEvent::Chunk(text.into(), None)
    }

    fn data(json: &str) -> String {
        format!("data: {json}\n\n")
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..10_000 {
            if condition() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn successful_chat_emits_cumulative_chunks_then_completes_once() {
        let transport = FakeTransport::new(vec![Behavior::Chunks(vec![
            data(r#"{"content":"Hi"}"#),
            data(r#"{"content":" there"}"#),
            data("[DONE]"),
        ])]);
        let streamer = ChatStreamer::new(transport.clone());
        let mut sink = RecordingSink::default();

        let outcome = streamer
            .send_message("hello", None, &mut sink)
            .await
            .expect("send");

        assert_eq!(
            sink.events(),
            vec![chunk("Hi"), chunk("Hi there"), SinkEvent::Complete]
        );
        assert_eq!(
            outcome,
            StreamOutcome::Completed {
                text: "Hi there".into(),
                thread_id: None
            }
        );
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, SEND_PATH);
        assert_eq!(
            requests[0].body,
            RequestBody::Json(serde_json::json!({"message": "hello", "thread_id": null}))
        );
        assert!(!streamer.is_streaming());
    }

    #[tokio::test]
    async fn frames_without_content_are_skipped() {
        let transport = FakeTransport::new(vec![Behavior::Chunks(vec![
            data(r#"{}"#),
            data(r#"{"content":"Hi"}"#),
            data(r#"{"content":""}"#),
            data(r#"{"content":null,"thread_id":null}"#),
            data("[DONE]"),
        ])]);
        let streamer = ChatStreamer::new(transport);
        let mut sink = RecordingSink::default();

        streamer
            .send_message("hello", None, &mut sink)
            .await
            .expect("send");

        assert_eq!(sink.events(), vec![chunk("Hi"), SinkEvent::Complete]);
    }

    #[tokio::test]
    async fn server_error_frame_stops_stream_without_completion() {
        let transport = FakeTransport::new(vec![Behavior::Chunks(vec![
            data(r#"{"content":"par"}"#),
            data(r#"{"error":"boom"}"#),
            data(r#"{"content":"ignored"}"#),
            data("[DONE]"),
        ])]);
        let streamer = ChatStreamer::new(transport);
        let mut sink = RecordingSink::default();

        let outcome = streamer
            .send_message("hello", Some("t-1"), &mut sink)
            .await
            .expect("send");

        assert_eq!(
            sink.events(),
            vec![chunk("par"), SinkEvent::Error("boom".into())]
        );
        assert_eq!(
            outcome,
            StreamOutcome::Failed {
                message: "boom".into(),
                partial: "par".into()
            }
        );
    }

    #[tokio::test]
    async fn thread_id_is_surfaced_exactly_once() {
        let transport = FakeTransport::new(vec![Behavior::Chunks(vec![
            data(r#"{"thread_id":"t-9"}"#),
            data(r#"{"content":"a","thread_id":"t-9"}"#),
            data(r#"{"content":"b"}"#),
        ])]);
        let streamer = ChatStreamer::new(transport);
        let mut sink = RecordingSink::default();

        let outcome = streamer
            .send_message("hello", None, &mut sink)
            .await
            .expect("send");

        assert_eq!(
            sink.events(),
            vec![
                SinkEvent::Chunk(String::new(), Some("t-9".into())),
                chunk("a"),
                chunk("ab"),
                SinkEvent::Complete,
            ]
        );
        assert_eq!(
            outcome,
            StreamOutcome::Completed {
                text: "ab".into(),
                thread_id: Some("t-9".into())
            }
        );
    }

    #[tokio::test]
    async fn thread_id_rides_along_with_first_chunk_and_known_id_is_not_repeated() {
        let transport = FakeTransport::new(vec![
            Behavior::Chunks(vec![data(r#"{"content":"a","thread_id":"t-2"}"#)]),
            Behavior::Chunks(vec![data(r#"{"content":"b","thread_id":"t-2"}"#)]),
        ]);
        let streamer = ChatStreamer::new(transport);

        let mut first = RecordingSink::default();
        streamer
            .send_message("one", None, &mut first)
            .await
            .expect("send");
        assert_eq!(
            first.events()[0],
            SinkEvent::Chunk("a".into(), Some("t-2".into()))
        );

        let mut second = RecordingSink::default();
        streamer
            .send_message("two", Some("t-2"), &mut second)
            .await
            .expect("send");
        assert_eq!(second.events(), vec![chunk("b"), SinkEvent::Complete]);
    }

    #[tokio::test]
    async fn malformed_record_is_skipped() {
        let transport = FakeTransport::new(vec![Behavior::Chunks(vec![
            data(r#"{"content":"a"}"#),
            data(r#"{"content":"#),
            data(r#"{"content":"b"}"#),
            data("[DONE]"),
        ])]);
        let streamer = ChatStreamer::new(transport);
        let mut sink = RecordingSink::default();
        streamer
            .send_message("hello", None, &mut sink)
            .await
            .expect("send");
        assert_eq!(
            sink.events(),
            vec![chunk("a"), chunk("ab"), SinkEvent::Complete]
        );
    }

    #[tokio::test]
    async fn buffered_and_split_streamed_bodies_produce_identical_callbacks() {
        let body = [
            data(r#"{"content":"Hel"}"#),
            ": comment\n\n".to_string(),
            data(r#"{"content":"lo"}"#),
            data("[DONE]"),
        ]
        .concat();
        let split: Vec<String> = body
            .as_bytes()
            .chunks(3)
            .map(|c| String::from_utf8(c.to_vec()).expect("ascii"))
            .collect();
        let transport = FakeTransport::new(vec![Behavior::Buffered(body), Behavior::Chunks(split)]);
        let streamer = ChatStreamer::new(transport);

        let mut buffered = RecordingSink::default();
        streamer
            .send_message("hi", None, &mut buffered)
            .await
            .expect("send");
        let mut streamed = RecordingSink::default();
        streamer
            .send_message("hi", None, &mut streamed)
            .await
            .expect("send");

        assert_eq!(
            buffered.events(),
            vec![chunk("Hel"), chunk("Hello"), SinkEvent::Complete]
        );
        assert_eq!(buffered.events(), streamed.events());
    }

    #[tokio::test]
    async fn completion_fires_once_after_many_chunks() {
        let mut chunks: Vec<String> = (0..50).map(|i| data(&format!(r#"{{"content":"{i},"}}"#))).collect();
        chunks.push(data("[DONE]"));
        let transport = FakeTransport::new(vec![Behavior::Chunks(chunks)]);
        let streamer = ChatStreamer::new(transport);
        let mut sink = RecordingSink::default();
        streamer
            .send_message("count", None, &mut sink)
            .await
            .expect("send");
        let events = sink.events();
        assert_eq!(events.len(), 51);
        assert_eq!(
            events.iter().filter(|e| **e == SinkEvent::Complete).count(),
            1
        );
    }

    #[tokio::test]
    async fn request_failure_is_reported_through_on_error() {
        let transport = FakeTransport::new(vec![Behavior::Fail(ClientError::transport(
            "connection refused",
        ))]);
        let streamer = ChatStreamer::new(transport);
        let mut sink = RecordingSink::default();
        let outcome = streamer
            .send_message("hello", None, &mut sink)
            .await
            .expect("send");
        assert_eq!(
            sink.events(),
            vec![SinkEvent::Error("connection refused".into())]
        );
        assert!(matches!(outcome, StreamOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn read_failure_keeps_partial_text() {
        let transport = FakeTransport::new(vec![Behavior::ReadError(
            vec![data(r#"{"content":"par"}"#)],
            ClientError::transport("connection reset"),
        )]);
        let streamer = ChatStreamer::new(transport);
        let mut sink = RecordingSink::default();
        let outcome = streamer
            .send_message("hello", None, &mut sink)
            .await
            .expect("send");
        assert_eq!(
            sink.events(),
            vec![chunk("par"), SinkEvent::Error("connection reset".into())]
        );
        assert_eq!(
            outcome,
            StreamOutcome::Failed {
                message: "connection reset".into(),
                partial: "par".into()
            }
        );
    }

    #[tokio::test]
    async fn blank_message_is_rejected_without_request() {
        let transport = FakeTransport::new(vec![]);
        let streamer = ChatStreamer::new(transport.clone());
        let mut sink = RecordingSink::default();
        let err = streamer
            .send_message("   ", None, &mut sink)
            .await
            .expect_err("blank");
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(transport.requests().is_empty());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn cancel_suppresses_further_callbacks() {
        let transport = FakeTransport::new(vec![Behavior::ChunksThenPending(vec![data(
            r#"{"content":"Hi"}"#,
        )])]);
        let streamer = Arc::new(ChatStreamer::new(transport));
        let sink = RecordingSink::default();

        let task = {
            let streamer = streamer.clone();
            let mut sink = sink.clone();
            tokio::spawn(async move { streamer.send_message("hello", None, &mut sink).await })
        };
        wait_until(|| sink.events().len() == 1).await;
        assert!(streamer.is_streaming());
        assert!(streamer.cancel());

        let outcome = task.await.expect("join").expect("send");
        assert_eq!(outcome, StreamOutcome::Cancelled);
        assert_eq!(sink.events(), vec![chunk("Hi"), SinkEvent::Cancelled]);
        assert!(!streamer.is_streaming());
        assert!(!streamer.cancel());
    }

    #[tokio::test]
    async fn cancel_while_request_is_opening() {
        let transport = FakeTransport::new(vec![Behavior::PendingOpen]);
        let streamer = Arc::new(ChatStreamer::new(transport));
        let sink = RecordingSink::default();

        let task = {
            let streamer = streamer.clone();
            let mut sink = sink.clone();
            tokio::spawn(async move { streamer.send_message("hello", None, &mut sink).await })
        };
        wait_until(|| streamer.is_streaming()).await;
        streamer.abort_handle().expect("handle").abort();

        assert_eq!(task.await.expect("join").expect("send"), StreamOutcome::Cancelled);
        assert_eq!(sink.events(), vec![SinkEvent::Cancelled]);
    }

    #[tokio::test]
    async fn new_send_cancels_the_stream_in_flight() {
        let transport = FakeTransport::new(vec![
            Behavior::ChunksThenPending(vec![]),
            Behavior::Chunks(vec![data(r#"{"content":"fresh"}"#), data("[DONE]")]),
        ]);
        let streamer = Arc::new(ChatStreamer::new(transport));
        let old_sink = RecordingSink::default();

        let old = {
            let streamer = streamer.clone();
            let mut sink = old_sink.clone();
            tokio::spawn(async move { streamer.send_message("first", None, &mut sink).await })
        };
        wait_until(|| streamer.is_streaming()).await;

        let mut new_sink = RecordingSink::default();
        let outcome = streamer
            .send_message("second", None, &mut new_sink)
            .await
            .expect("send");

        assert!(matches!(outcome, StreamOutcome::Completed { .. }));
        assert_eq!(new_sink.events(), vec![chunk("fresh"), SinkEvent::Complete]);
        assert_eq!(old.await.expect("join").expect("send"), StreamOutcome::Cancelled);
        assert_eq!(old_sink.events(), vec![SinkEvent::Cancelled]);
        assert!(!streamer.is_streaming());
    }

    #[tokio::test]
    async fn edit_stream_only_honours_content_and_done() {
        let transport = FakeTransport::new(vec![Behavior::Chunks(vec![
            data(r#"{"content":"x","thread_id":"t-1"}"#),
            data(r#"{"error":"not for edits"}"#),
            data(r#"{"content":"y"}"#),
            data("[DONE]"),
        ])]);
        let streamer = ChatStreamer::new(transport.clone());
        let mut sink = RecordingSink::default();

        let outcome = streamer
            .edit_message("m-1", "new text", &mut sink)
            .await
            .expect("edit");

        assert_eq!(
            sink.events(),
            vec![chunk("x"), chunk("xy"), SinkEvent::Complete]
        );
        assert_eq!(
            outcome,
            StreamOutcome::Completed {
                text: "xy".into(),
                thread_id: None
            }
        );
        let requests = transport.requests();
        assert_eq!(requests[0].path, EDIT_PATH);
        assert_eq!(
            requests[0].body,
            RequestBody::Json(serde_json::json!({"message_id": "m-1", "new_content": "new text"}))
        );
    }

    #[tokio::test]
    async fn edit_requires_message_id() {
        let streamer = ChatStreamer::new(FakeTransport::new(vec![]));
        let mut sink = RecordingSink::default();
        let err = streamer
            .edit_message(" ", "text", &mut sink)
            .await
            .expect_err("missing id");
        assert!(matches!(err, ClientError::Validation(msg) if msg.contains("message id")));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_fails_a_stalled_reply() {
        let transport = FakeTransport::new(vec![Behavior::ChunksThenPending(vec![data(
            r#"{"content":"slow"}"#,
        )])]);
        let streamer =
            ChatStreamer::new(transport).idle_timeout(Some(Duration::from_secs(30)));
        let mut sink = RecordingSink::default();
        let outcome = streamer
            .send_message("hello", None, &mut sink)
            .await
            .expect("send");
        assert_eq!(
            outcome,
            StreamOutcome::Failed {
                message: "no data received for 30s".into(),
                partial: "slow".into()
            }
        );
    }
}
