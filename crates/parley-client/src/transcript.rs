//! In-memory conversation transcript fed by chat streams.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::chat::ChatSink;

/// Author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One transcript entry, shaped like the conversation history records.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// Server id, or a local UUID until the conversation is reloaded.
    pub id: String,
    /// Conversation the message belongs to; empty before one is assigned.
    #[serde(default)]
    pub chat_id: String,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_summarized: bool,
    /// Content is still being streamed.
    #[serde(default, skip_serializing)]
    pub pending: bool,
}

impl Message {
    fn local(role: Role, chat_id: &str, content: impl Into<String>, pending: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
            is_summarized: false,
            pending,
        }
    }
}

/// Ordered messages of one conversation.
///
/// At most one assistant message is pending at a time; starting a new
/// exchange settles the previous one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    thread_id: Option<String>,
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the transcript of conversation `thread_id` from its history.
    pub fn from_messages(thread_id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            messages,
        }
    }

    /// Conversation id, once the server has assigned one.
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the assistant message currently being streamed.
    pub fn pending(&self) -> Option<&Message> {
        self.messages
            .last()
            .filter(|m| m.role == Role::Assistant && m.pending)
    }

    /// Swaps in freshly loaded history, replacing local ids with server ids.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Appends a user message and an empty pending assistant reply.
    ///
    /// Returns the local id of the user message.
    pub fn begin_exchange(&mut self, user_text: impl Into<String>) -> String {
        self.settle_pending();
        let chat_id = self.thread_id.clone().unwrap_or_default();
        let user = Message::local(Role::User, &chat_id, user_text, false);
        let id = user.id.clone();
        self.messages.push(user);
        self.messages
            .push(Message::local(Role::Assistant, &chat_id, "", true));
        id
    }

    /// Truncates at `message_id`, replaces its content and appends a pending
    /// assistant reply. Returns false when the message is unknown.
    pub fn begin_edit(&mut self, message_id: &str, new_content: impl Into<String>) -> bool {
        let Some(index) = self.messages.iter().position(|m| m.id == message_id) else {
            return false;
        };
        self.messages.truncate(index + 1);
        let edited = &mut self.messages[index];
        edited.content = new_content.into();
        edited.pending = false;
        let chat_id = edited.chat_id.clone();
        self.messages
            .push(Message::local(Role::Assistant, &chat_id, "", true));
        true
    }

    /// Replaces the content of the pending assistant reply.
    pub fn set_pending_content(&mut self, text: &str) {
        if let Some(last) = self
            .messages
            .last_mut()
            .filter(|m| m.role == Role::Assistant && m.pending)
        {
            last.content.clear();
            last.content.push_str(text);
        }
    }

    /// Marks the pending reply as finished, keeping whatever content arrived.
    pub fn settle_pending(&mut self) {
        for message in self.messages.iter_mut().filter(|m| m.pending) {
            message.pending = false;
        }
    }

    /// Settles the pending reply and appends an assistant error note.
    pub fn push_error(&mut self, message: &str) {
        self.settle_pending();
        let chat_id = self.thread_id.clone().unwrap_or_default();
        self.messages.push(Message::local(
            Role::Assistant,
            &chat_id,
            format!("Error: {message}"),
            false,
        ));
    }

    fn assign_thread(&mut self, thread_id: &str) {
        self.thread_id = Some(thread_id.to_string());
        for message in self.messages.iter_mut().filter(|m| m.chat_id.is_empty()) {
            message.chat_id = thread_id.to_string();
        }
    }

    /// Sink that streams a reply into this transcript.
    pub fn sink(&mut self) -> TranscriptSink<'_> {
        TranscriptSink { transcript: self }
    }
}

/// [`ChatSink`] that writes into a [`Transcript`].
pub struct TranscriptSink<'a> {
    transcript: &'a mut Transcript,
}

impl TranscriptSink<'_> {
    /// Conversation id of the transcript being written.
    pub fn thread_id(&self) -> Option<&str> {
        self.transcript.thread_id()
    }
}

impl ChatSink for TranscriptSink<'_> {
    fn on_chunk(&mut self, text: &str, thread_id: Option<&str>) {
        if let Some(id) = thread_id {
            self.transcript.assign_thread(id);
        }
        self.transcript.set_pending_content(text);
    }

    fn on_error(&mut self, message: &str) {
        self.transcript.push_error(message);
    }

    fn on_complete(&mut self) {
        self.transcript.settle_pending();
    }

    fn on_cancelled(&mut self) {
        self.transcript.settle_pending();
    }
}
