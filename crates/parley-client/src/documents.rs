//! Uploaded documents and generated reports stored by the ingestion service.

use serde_json::Value;

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::transport::http::{path_segment, send_json, with_bearer};

pub const FILES_PATH: &str = "/process/files";
pub const DOWNLOAD_PATH: &str = "/process/download";

/// Remote file names known to the ingestion service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileListing {
    pub uploaded_pdfs: Vec<String>,
    pub generated_reports: Vec<String>,
}

impl FileListing {
    /// Reads a listing body. Fields that are missing or not lists read as empty.
    fn from_value(value: &Value) -> Self {
        Self {
            uploaded_pdfs: string_list(value, "uploaded_pdfs"),
            generated_reports: string_list(value, "generated_reports"),
        }
    }
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Request/response client for the document listing endpoints.
#[derive(Clone)]
pub struct DocumentsClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl DocumentsClient {
    pub(crate) fn with_client(http: reqwest::Client, config: ClientConfig) -> Self {
        Self { http, config }
    }

    /// Lists uploaded PDFs and generated reports.
    pub async fn list(&self) -> Result<FileListing, ClientError> {
        let request = with_bearer(self.http.get(self.config.endpoint(FILES_PATH)), &self.config)
            .timeout(self.config.timeout);
        let body: Value = send_json(request, "Failed to load files").await?;
        Ok(FileListing::from_value(&body))
    }

    /// Endpoint that resolves `filename` to a download link.
    pub fn download_url(&self, filename: &str) -> Result<String, ClientError> {
        let filename = path_segment("file name", filename)?;
        Ok(self.config.endpoint(&format!("{DOWNLOAD_PATH}/{filename}")))
    }

    /// Resolves the link a generated report can be downloaded from.
    pub async fn report_download_url(&self, filename: &str) -> Result<String, ClientError> {
        let request = with_bearer(self.http.get(self.download_url(filename)?), &self.config)
            .timeout(self.config.timeout);
        let body: Value = send_json(request, "Failed to get download link").await?;
        body.get("report_download_url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(ToOwned::to_owned)
            .ok_or_else(|| ClientError::Decode("Download URL missing".into()))
    }
}
