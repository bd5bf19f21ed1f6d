//! `parley` command-line client.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, ConnectionArgs};
use parley_client::{Client, ClientConfig};

fn client_config(connection: ConnectionArgs) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = connection.base_url {
        config = config.base_url(base_url);
    }
    if let Some(token) = connection.token {
        config = config.access_token(token);
    }
    if let Some(delivery) = connection.delivery {
        config = config.delivery(delivery);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    parley_client::observability::init_observability();

    let cli = Cli::parse();
    let client = Client::new(client_config(cli.connection)?)?;

    match cli.command {
        Commands::Chat { message, thread } => {
            commands::chat::send(&client, &message, thread.as_deref()).await
        }
        Commands::Edit {
            message_id,
            content,
            chat,
        } => commands::chat::edit(&client, chat.as_deref(), &message_id, &content).await,
        Commands::History { chat_id } => commands::history::show(&client, chat_id.as_deref()).await,
        Commands::Delete { chat_id } => commands::history::delete(&client, &chat_id).await,
        Commands::Files => commands::files::list(&client).await,
        Commands::Download { filename } => commands::files::download(&client, &filename).await,
        Commands::Upload { path, mime } => commands::upload::run(&client, path, mime).await,
        Commands::Login { username, password } => {
            commands::auth::login(&client, &username, &password).await
        }
        Commands::Me => commands::auth::me(&client).await,
    }
}
