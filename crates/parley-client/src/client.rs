use std::sync::Arc;

use crate::auth::AuthClient;
use crate::chat::ChatStreamer;
use crate::config::ClientConfig;
use crate::documents::DocumentsClient;
use crate::errors::ClientError;
use crate::history::HistoryClient;
use crate::ingest::IngestionRelay;
use crate::transport::http::build_http_client;
use crate::transport::{HttpTransport, Transport};

pub(crate) struct ClientInner {
    config: ClientConfig,
    chat: ChatStreamer,
    ingestion: IngestionRelay,
    auth: AuthClient,
    history: HistoryClient,
    documents: DocumentsClient,
}

/// Entry point bundling the chat consumer, the ingestion relay and the
/// request/response endpoints over one HTTP connection pool.
///
/// Cloning is cheap and clones share the active-stream slot.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Creates a client talking HTTP to `config.base_url`.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = build_http_client(&config)?;
        let transport = Arc::new(HttpTransport::with_client(http.clone(), config.clone()));
        Ok(Self::assemble(config, transport, http))
    }

    /// Creates a client whose streaming endpoints go through `transport`.
    ///
    /// Account, history and document endpoints still use HTTP against
    /// `config.base_url`.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        let http = build_http_client(&config)?;
        Ok(Self::assemble(config, transport, http))
    }

    fn assemble(config: ClientConfig, transport: Arc<dyn Transport>, http: reqwest::Client) -> Self {
        let chat = ChatStreamer::new(transport.clone()).idle_timeout(config.idle_timeout);
        let ingestion = IngestionRelay::new(transport).idle_timeout(config.idle_timeout);
        let auth = AuthClient::with_client(http.clone(), config.clone());
        let history = HistoryClient::with_client(http.clone(), config.clone());
        let documents = DocumentsClient::with_client(http, config.clone());
        Self {
            inner: Arc::new(ClientInner {
                config,
                chat,
                ingestion,
                auth,
                history,
                documents,
            }),
        }
    }

    /// Chat send/edit consumer.
    pub fn chat(&self) -> &ChatStreamer {
        &self.inner.chat
    }

    /// Bulk document ingestion relay.
    pub fn ingestion(&self) -> &IngestionRelay {
        &self.inner.ingestion
    }

    /// Login, signup and profile calls.
    pub fn auth(&self) -> &AuthClient {
        &self.inner.auth
    }

    /// Stored conversations.
    pub fn history(&self) -> &HistoryClient {
        &self.inner.history
    }

    /// Uploaded documents and generated reports.
    pub fn documents(&self) -> &DocumentsClient {
        &self.inner.documents
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}
