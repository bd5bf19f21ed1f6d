use std::collections::VecDeque;

use chrono::{Local, NaiveTime};

use crate::frame::IngestEvent;
use crate::ingest::IngestSink;

/// Maximum number of lines kept in the job log.
pub const LOG_CAPACITY: usize = 20;

/// Progress view of one upload, built from relayed events.
///
/// Log lines are newest first and stamped with the time the event was
/// relayed, not the server time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadJob {
    pub job_id: Option<String>,
    pub total_files: u64,
    pub processed_files: u64,
    pub status: String,
    pub report_url: Option<String>,
    pub error: Option<String>,
    log: VecDeque<String>,
    logged: u64,
}

impl UploadJob {
    pub fn new() -> Self {
        Self {
            status: "Initializing...".to_string(),
            ..Self::default()
        }
    }

    /// Log lines, newest first.
    pub fn log(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(String::as_str)
    }

    /// Total number of lines ever logged, including evicted ones.
    pub fn lines_logged(&self) -> u64 {
        self.logged
    }

    /// Applies an event relayed at `at`.
    pub fn apply(&mut self, event: &IngestEvent, at: NaiveTime) {
        let line = match event {
            IngestEvent::Initialized { job_id } => {
                self.job_id.clone_from(job_id);
                self.status = "Job Initialized".into();
                job_id.as_deref().map(|id| {
                    let short: String = id.chars().take(8).collect();
                    format!("Job ID: {short}...")
                })
            }
            IngestEvent::UploadComplete {} => {
                self.status = "Source Uploaded".into();
                None
            }
            IngestEvent::ProcessingStarted {} => {
                self.status = "Server Processing...".into();
                None
            }
            IngestEvent::BatchStart { total_files } => {
                self.total_files = *total_files;
                self.status = "Processing...".into();
                None
            }
            IngestEvent::FileFinished { filename } => {
                self.processed_files += 1;
                Some(format!("✓ {}", filename.as_deref().unwrap_or("(unnamed)")))
            }
            IngestEvent::BatchCompleted {
                stats,
                master_report_url,
            } => {
                self.status = "Finished".into();
                self.report_url.clone_from(master_report_url);
                stats.map(|stats| {
                    self.processed_files = stats.processed + stats.failed;
                    format!("DONE. Success: {}", stats.processed)
                })
            }
            IngestEvent::Completed { report_url } => {
                self.status = "Finished".into();
                self.report_url.clone_from(report_url);
                None
            }
            IngestEvent::Error { error } | IngestEvent::FatalError { error } => {
                let message = error.as_deref().unwrap_or("unknown error");
                self.error = Some(message.to_string());
                Some(format!("ERROR: {message}"))
            }
            IngestEvent::Other => None,
        };
        if let Some(line) = line {
            self.push_log(format!("[{}] {line}", at.format("%H:%M:%S")));
        }
    }

    fn push_log(&mut self, line: String) {
        self.log.push_front(line);
        self.log.truncate(LOG_CAPACITY);
        self.logged += 1;
    }
}

impl IngestSink for UploadJob {
    fn on_status_update(&mut self, event: &IngestEvent) {
        self.apply(event, Local::now().time());
    }

    fn on_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
        self.status = "Failed".into();
    }

    fn on_complete(&mut self, report_url: Option<&str>) {
        self.status = "Finished".into();
        if let Some(url) = report_url {
            self.report_url = Some(url.to_string());
        }
    }
}
