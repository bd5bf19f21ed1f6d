use std::io::Write;

use anyhow::{Result, bail};
use parley_client::{ChatSink, Client, StreamOutcome};
use tracing::debug;

/// Prints only the part of each cumulative chunk not yet shown.
///
/// Errors are not printed here; the command reports them once on exit.
struct DeltaPrinter<W> {
    out: W,
    shown: String,
    thread_id: Option<String>,
}

impl DeltaPrinter<std::io::Stdout> {
    fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> DeltaPrinter<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            shown: String::new(),
            thread_id: None,
        }
    }

    fn delta<'a>(&mut self, text: &'a str) -> &'a str {
        let delta = match text.strip_prefix(self.shown.as_str()) {
            Some(rest) => rest,
            None if self.shown.is_empty() => text,
            // Earlier text was rewritten; start a fresh line.
            None => {
                self.shown.clear();
                let _ = writeln!(self.out);
                text
            }
        };
        self.shown.push_str(delta);
        delta
    }

    /// Terminates a partially printed reply.
    fn end_line(&mut self) {
        if !self.shown.is_empty() {
            let _ = writeln!(self.out);
        }
        let _ = self.out.flush();
    }
}

impl<W: Write + Send> ChatSink for DeltaPrinter<W> {
    fn on_chunk(&mut self, text: &str, thread_id: Option<&str>) {
        if let Some(id) = thread_id {
            self.thread_id = Some(id.to_string());
        }
        let delta = self.delta(text);
        let _ = write!(self.out, "{delta}");
        let _ = self.out.flush();
    }

    fn on_error(&mut self, _message: &str) {
        self.end_line();
    }

    fn on_complete(&mut self) {
        self.end_line();
    }

    fn on_cancelled(&mut self) {
        self.end_line();
        eprintln!("(cancelled)");
    }
}

/// Cancels the client's active chat stream on Ctrl-C.
fn cancel_on_ctrl_c(client: &Client) -> tokio::task::JoinHandle<()> {
    let client = client.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("ctrl-c received");
            client.chat().cancel();
        }
    })
}

fn finish<W>(outcome: StreamOutcome, printer: &DeltaPrinter<W>) -> Result<()> {
    match outcome {
        StreamOutcome::Completed { .. } => {
            if let Some(id) = printer.thread_id.as_deref() {
                eprintln!("thread: {id}");
            }
            Ok(())
        }
        StreamOutcome::Failed { message, .. } => bail!(message),
        StreamOutcome::Cancelled => Ok(()),
    }
}

pub async fn send(client: &Client, message: &str, thread_id: Option<&str>) -> Result<()> {
    let mut printer = DeltaPrinter::stdout();
    let watcher = cancel_on_ctrl_c(client);
    let outcome = client
        .chat()
        .send_message(message, thread_id, &mut printer)
        .await;
    watcher.abort();
    finish(outcome?, &printer)
}

/// Streams the reply regenerated for an edited message.
///
/// With `chat_id`, the conversation is loaded first so an unknown message id
/// fails before anything is sent.
pub async fn edit(
    client: &Client,
    chat_id: Option<&str>,
    message_id: &str,
    content: &str,
) -> Result<()> {
    if let Some(chat_id) = chat_id {
        let mut transcript = client.history().load_transcript(chat_id).await?;
        if !transcript.begin_edit(message_id, content) {
            bail!("unknown message id `{message_id}` in conversation {chat_id}");
        }
    }
    let mut printer = DeltaPrinter::stdout();
    let watcher = cancel_on_ctrl_c(client);
    let outcome = client
        .chat()
        .edit_message(message_id, content, &mut printer)
        .await;
    watcher.abort();
    finish(outcome?, &printer)
}
