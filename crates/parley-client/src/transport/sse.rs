//! Record splitting for `data:`-prefixed event bodies.
//!
//! Two strategies produce the same records: [`EventDecoder`] consumes byte
//! chunks as they arrive, [`parse_body`] works on a fully buffered body.

use std::collections::VecDeque;
use std::time::Duration;

use futures::StreamExt as _;
use futures::stream::{self, BoxStream};
use tracing::debug;

use crate::errors::ClientError;

use super::{ByteStream, ResponseBody};

/// Prefix that marks a significant record.
pub const DATA_PREFIX: &str = "data: ";
/// Literal payload that ends a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One significant record with its `data: ` prefix removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// The done sentinel.
    Done,
    /// Trimmed payload text, expected to be JSON.
    Data(String),
}

/// Lazy sequence of records read from a response body.
pub type RecordStream = BoxStream<'static, Result<Record, ClientError>>;

/// Incremental record decoder.
///
/// Bytes are buffered until a blank line closes a record, so records and
/// UTF-8 sequences split across chunk boundaries decode correctly. `\r\n`
/// is folded to `\n` on the way in, matching [`parse_body`].
#[derive(Default)]
pub struct EventDecoder {
    buf: Vec<u8>,
    /// A `\r` ended the previous chunk and may start a `\r\n`.
    held_cr: bool,
    /// Bytes before this offset hold no record delimiter.
    scanned: usize,
}

impl EventDecoder {
    /// Appends a chunk and returns every record it completed.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<Record> {
        self.buf.reserve(chunk.len());
        for &byte in chunk {
            if std::mem::take(&mut self.held_cr) && byte != b'\n' {
                self.buf.push(b'\r');
            }
            if byte == b'\r' {
                self.held_cr = true;
            } else {
                self.buf.push(byte);
            }
        }

        let mut records = Vec::new();
        while let Some(idx) = find_record_delimiter(&self.buf, self.scanned) {
            let record_bytes: Vec<u8> = self.buf.drain(..idx + 2).take(idx).collect();
            self.scanned = 0;
            if let Some(record) = parse_record(&String::from_utf8_lossy(&record_bytes)) {
                records.push(record);
            }
        }
        // Keep the last byte: it may be the first half of a delimiter.
        self.scanned = self.buf.len().saturating_sub(1);
        records
    }

    /// Flushes a trailing record that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<Record> {
        if std::mem::take(&mut self.held_cr) {
            self.buf.push(b'\r');
        }
        self.scanned = 0;
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        parse_record(&String::from_utf8_lossy(&rest))
    }
}

fn find_record_delimiter(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(2)
        .position(|pair| pair == b"\n\n")
        .map(|pos| from + pos)
}

fn parse_record(raw: &str) -> Option<Record> {
    let raw = raw.trim_start_matches(['\r', '\n']);
    let payload = raw.strip_prefix(DATA_PREFIX)?.trim();
    if payload == DONE_SENTINEL {
        return Some(Record::Done);
    }
    Some(Record::Data(payload.to_string()))
}

/// Splits a fully buffered body into records.
///
/// Records after the done sentinel are not returned.
pub fn parse_body(body: &str) -> Vec<Record> {
    let normalized = body.replace("\r\n", "\n");
    let mut records = Vec::new();
    for raw in normalized.split("\n\n") {
        let Some(record) = parse_record(raw) else {
            continue;
        };
        let done = record == Record::Done;
        records.push(record);
        if done {
            break;
        }
    }
    records
}

/// Turns a response body into a record stream, choosing the strategy from
/// the body's capability.
pub(crate) fn record_stream(body: ResponseBody, idle_timeout: Option<Duration>) -> RecordStream {
    match body {
        ResponseBody::Buffered(text) => {
            let records = parse_body(&text);
            debug!(records = records.len(), "decoded buffered event body");
            stream::iter(records.into_iter().map(Ok)).boxed()
        }
        ResponseBody::Streamed(bytes) => incremental_records(bytes, idle_timeout).boxed(),
    }
}

fn incremental_records(
    bytes_stream: ByteStream,
    idle_timeout: Option<Duration>,
) -> impl futures::Stream<Item = Result<Record, ClientError>> + Send {
    struct State {
        bytes_stream: ByteStream,
        decoder: EventDecoder,
        pending: VecDeque<Record>,
        idle_timeout: Option<Duration>,
        done: bool,
    }

    stream::try_unfold(
        State {
            bytes_stream,
            decoder: EventDecoder::default(),
            pending: VecDeque::new(),
            idle_timeout,
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(record) = state.pending.pop_front() {
                    if record == Record::Done {
                        state.pending.clear();
                        state.done = true;
                    }
                    return Ok(Some((record, state)));
                }
                if state.done {
                    return Ok(None);
                }

                let next = match state.idle_timeout {
                    Some(limit) => tokio::time::timeout(limit, state.bytes_stream.next())
                        .await
                        .map_err(|_| {
                            ClientError::transport(format!(
                                "no data received for {}s",
                                limit.as_secs()
                            ))
                        })?,
                    None => state.bytes_stream.next().await,
                };
                match next {
                    Some(Ok(chunk)) => {
                        state.pending.extend(state.decoder.push_chunk(&chunk));
                    }
                    Some(Err(err)) => return Err(err),
                    None => {
                        state.pending.extend(state.decoder.finish());
                        state.done = true;
                    }
                }
            }
        },
    )
}
