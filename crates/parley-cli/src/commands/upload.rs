use std::path::PathBuf;

use anyhow::{Result, bail};
use parley_client::{
    Client, IngestEvent, IngestSink, RelayOutcome, UploadFile, UploadJob, abort_pair,
};

/// Keeps an [`UploadJob`] and echoes each new log line.
struct JobPrinter {
    job: UploadJob,
    printed: u64,
}

impl JobPrinter {
    fn flush_log(&mut self) {
        let fresh = self.job.lines_logged() - self.printed;
        let mut lines: Vec<&str> = self.job.log().take(fresh as usize).collect();
        lines.reverse();
        for line in lines {
            println!("{line}");
        }
        self.printed = self.job.lines_logged();
    }
}

impl IngestSink for JobPrinter {
    fn on_status_update(&mut self, event: &IngestEvent) {
        let status = self.job.status.clone();
        self.job.on_status_update(event);
        self.flush_log();
        if self.job.status != status {
            println!(
                "-- {} ({}/{})",
                self.job.status, self.job.processed_files, self.job.total_files
            );
        }
    }

    fn on_error(&mut self, message: &str) {
        self.job.on_error(message);
    }

    fn on_complete(&mut self, report_url: Option<&str>) {
        self.job.on_complete(report_url);
    }
}

pub async fn run(client: &Client, path: PathBuf, mime: Option<String>) -> Result<()> {
    let mime = mime.unwrap_or_else(|| UploadFile::guess_mime(&path).to_string());
    let file = UploadFile::from_path(path, mime);

    let (handle, mut signal) = abort_pair();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.abort();
        }
    });

    let mut printer = JobPrinter {
        job: UploadJob::new(),
        printed: 0,
    };
    let outcome = client
        .ingestion()
        .upload_bulk_until(&file, &mut signal, &mut printer)
        .await;
    watcher.abort();

    match outcome {
        RelayOutcome::Completed { report_url } => {
            match report_url.or(printer.job.report_url) {
                Some(url) => println!("report: {url}"),
                None => println!("processing finished"),
            }
            Ok(())
        }
        RelayOutcome::Failed(message) => bail!(message),
        RelayOutcome::Unresolved => bail!("stream ended before processing finished"),
        RelayOutcome::Cancelled => {
            eprintln!("(cancelled)");
            Ok(())
        }
    }
}
