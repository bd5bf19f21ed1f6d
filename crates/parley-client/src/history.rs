//! Stored conversations: listing, loading and deleting chat history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::transcript::{Message, Transcript};
use crate::transport::http::{path_segment, send_empty, send_json, with_bearer};

/// Collection of the signed-in user's conversations.
pub const CHATS_PATH: &str = "/chat/history";

/// One stored conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request/response client for the conversation history endpoints.
#[derive(Clone)]
pub struct HistoryClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HistoryClient {
    pub(crate) fn with_client(http: reqwest::Client, config: ClientConfig) -> Self {
        Self { http, config }
    }

    fn chat_url(&self, chat_id: &str) -> Result<String, ClientError> {
        let chat_id = path_segment("chat id", chat_id)?;
        Ok(self.config.endpoint(&format!("{CHATS_PATH}/{chat_id}")))
    }

    /// Lists stored conversations.
    pub async fn list(&self) -> Result<Vec<ChatSession>, ClientError> {
        let request = with_bearer(self.http.get(self.config.endpoint(CHATS_PATH)), &self.config)
            .timeout(self.config.timeout);
        send_json(request, "Failed to load conversations").await
    }

    /// Messages of one conversation, oldest first, with server ids.
    pub async fn details(&self, chat_id: &str) -> Result<Vec<Message>, ClientError> {
        let request = with_bearer(self.http.get(self.chat_url(chat_id)?), &self.config)
            .timeout(self.config.timeout);
        let messages: Vec<Message> = send_json(request, "Failed to load messages").await?;
        debug!(chat_id, messages = messages.len(), "loaded conversation");
        Ok(messages)
    }

    /// Loads a conversation into a transcript whose ids can drive edits.
    pub async fn load_transcript(&self, chat_id: &str) -> Result<Transcript, ClientError> {
        let messages = self.details(chat_id).await?;
        Ok(Transcript::from_messages(chat_id.trim(), messages))
    }

    /// Deletes a conversation.
    pub async fn delete(&self, chat_id: &str) -> Result<(), ClientError> {
        let request = with_bearer(self.http.delete(self.chat_url(chat_id)?), &self.config)
            .timeout(self.config.timeout);
        send_empty(request, "Failed to delete conversation").await
    }
}
