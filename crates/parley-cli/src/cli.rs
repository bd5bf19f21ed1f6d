use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use parley_client::DeliveryMode;

#[derive(Parser)]
#[command(name = "parley")]
#[command(version, about = "Chat with the assistant backend and ingest documents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Overrides for values otherwise read from `PARLEY_*` variables.
#[derive(Args, Default)]
pub struct ConnectionArgs {
    /// Backend base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Bearer token for authenticated endpoints
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Body delivery strategy (`streamed` or `buffered`)
    #[arg(long, global = true)]
    pub delivery: Option<DeliveryMode>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a message and stream the reply
    Chat {
        message: String,

        /// Continue an existing conversation
        #[arg(long)]
        thread: Option<String>,
    },

    /// Replace a message and stream the regenerated reply
    Edit {
        message_id: String,
        content: String,

        /// Conversation to check the message id against before sending
        #[arg(long)]
        chat: Option<String>,
    },

    /// List conversations, or show one with its message ids
    History { chat_id: Option<String> },

    /// Delete a conversation
    Delete { chat_id: String },

    /// List uploaded documents and generated reports
    Files,

    /// Print the download link of a generated report
    Download { filename: String },

    /// Upload a document archive for processing
    Upload {
        path: PathBuf,

        /// MIME type; guessed from the extension when omitted
        #[arg(long)]
        mime: Option<String>,
    },

    /// Exchange credentials for tokens
    Login {
        username: String,

        #[arg(long)]
        password: String,
    },

    /// Show the profile of the signed-in user
    Me,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat_with_global_overrides() {
        let cli = Cli::try_parse_from([
            "parley",
            "chat",
            "hello there",
            "--thread",
            "t-1",
            "--delivery",
            "buffered",
        ])
        .expect("parse");
        assert!(matches!(
            cli.command,
            Commands::Chat { ref message, thread: Some(ref thread) } if message == "hello there" && thread == "t-1"
        ));
        assert_eq!(cli.connection.delivery, Some(DeliveryMode::Buffered));
    }

    #[test]
    fn parses_edit_with_conversation() {
        let cli = Cli::try_parse_from(["parley", "edit", "m-1", "new text", "--chat", "t-1"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Commands::Edit { ref message_id, ref content, chat: Some(ref chat) }
                if message_id == "m-1" && content == "new text" && chat == "t-1"
        ));
    }

    #[test]
    fn history_takes_an_optional_conversation() {
        let all = Cli::try_parse_from(["parley", "history"]).expect("parse");
        assert!(matches!(all.command, Commands::History { chat_id: None }));
        let one = Cli::try_parse_from(["parley", "history", "t-1"]).expect("parse");
        assert!(matches!(one.command, Commands::History { chat_id: Some(ref id) } if id == "t-1"));
        assert!(Cli::try_parse_from(["parley", "delete"]).is_err());
    }

    #[test]
    fn login_requires_password() {
        assert!(Cli::try_parse_from(["parley", "login", "ada"]).is_err());
    }

    #[test]
    fn rejects_unknown_delivery_mode() {
        assert!(Cli::try_parse_from(["parley", "me", "--delivery", "carrier-pigeon"]).is_err());
    }
}
