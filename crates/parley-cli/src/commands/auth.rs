use anyhow::{Context as _, Result};
use parley_client::Client;

pub async fn login(client: &Client, username: &str, password: &str) -> Result<()> {
    let auth = client.auth().login(username, password).await?;
    println!("{}", serde_json::to_string_pretty(&auth)?);
    Ok(())
}

pub async fn me(client: &Client) -> Result<()> {
    let token = client
        .config()
        .access_token
        .as_deref()
        .context("no access token; pass --token or set PARLEY_ACCESS_TOKEN")?;
    let user = client.auth().me(token).await?;
    println!("{}", serde_json::to_string_pretty(&user)?);
    if let Some(url) = client.auth().avatar_url(&user.avatar) {
        println!("avatar: {url}");
    }
    Ok(())
}
