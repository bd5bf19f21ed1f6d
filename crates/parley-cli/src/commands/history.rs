use anyhow::Result;
use parley_client::{ChatSession, Client, Message, Role};

fn session_line(session: &ChatSession) -> String {
    let title = session.title.as_deref().unwrap_or("(untitled)");
    match session.updated_at.or(session.created_at) {
        Some(at) => format!("{}  {}  {title}", session.id, at.format("%Y-%m-%d %H:%M")),
        None => format!("{}  {title}", session.id),
    }
}

fn message_line(message: &Message) -> String {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    };
    format!("[{}] {role}: {}", message.id, message.content)
}

/// Lists conversations, or prints one conversation with its message ids.
pub async fn show(client: &Client, chat_id: Option<&str>) -> Result<()> {
    match chat_id {
        None => {
            let sessions = client.history().list().await?;
            if sessions.is_empty() {
                println!("no conversations");
            }
            for session in &sessions {
                println!("{}", session_line(session));
            }
        }
        Some(chat_id) => {
            let transcript = client.history().load_transcript(chat_id).await?;
            for message in transcript.messages() {
                println!("{}", message_line(message));
            }
        }
    }
    Ok(())
}

pub async fn delete(client: &Client, chat_id: &str) -> Result<()> {
    client.history().delete(chat_id).await?;
    println!("deleted {chat_id}");
    Ok(())
}
