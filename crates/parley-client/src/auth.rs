//! Account endpoints: login, signup and the profile of the signed-in user.

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::transport::UploadPart;
use crate::transport::http::{decode_json, send_json};

pub const LOGIN_PATH: &str = "/auth/login";
pub const SIGNUP_PATH: &str = "/auth/signup";
pub const ME_PATH: &str = "/auth/me";
pub const AVATAR_PATH: &str = "/auth/avatar";

/// Tokens returned by login and signup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Profile of the signed-in user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    pub role: String,
}

/// Fields of a new account.
#[derive(Clone, Debug, Default)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<UploadPart>,
}

/// Profile fields to change. Unset fields are left untouched by the server.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<UploadPart>,
}

impl ProfileUpdate {
    fn into_form(self) -> Result<Form, ClientError> {
        let mut form = Form::new();
        for (field, value) in [
            ("name", self.name),
            ("email", self.email),
            ("password", self.password),
        ] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                form = form.text(field, value);
            }
        }
        if let Some(avatar) = self.avatar {
            form = form.part("avatar", file_part(avatar)?);
        }
        Ok(form)
    }
}

fn file_part(upload: UploadPart) -> Result<Part, ClientError> {
    Part::bytes(upload.bytes)
        .file_name(upload.file_name)
        .mime_str(&upload.mime_type)
        .map_err(|e| ClientError::Validation(format!("invalid mime type `{}`: {e}", upload.mime_type)))
}

/// Request/response client for the account endpoints.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl AuthClient {
    pub(crate) fn with_client(http: reqwest::Client, config: ClientConfig) -> Self {
        Self { http, config }
    }

    /// Exchanges credentials for tokens.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ClientError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ClientError::Validation(
                "username and password are required".into(),
            ));
        }
        let request = self
            .http
            .post(self.config.endpoint(LOGIN_PATH))
            .timeout(self.config.timeout)
            .form(&[
                ("username", username),
                ("password", password),
                ("grant_type", "password"),
            ]);
        debug!(username, "logging in");
        send_json(request, "Login failed").await
    }

    /// Creates an account with the `user` role.
    pub async fn signup(&self, signup: Signup) -> Result<AuthResponse, ClientError> {
        let mut form = Form::new()
            .text("name", signup.name)
            .text("email", signup.email)
            .text("password", signup.password)
            .text("role", "user");
        if let Some(avatar) = signup.avatar {
            form = form.part("avatar", file_part(avatar)?);
        }
        let request = self
            .http
            .post(self.config.endpoint(SIGNUP_PATH))
            .timeout(self.config.timeout)
            .multipart(form);
        send_json(request, "Signup failed").await
    }

    /// Fetches the profile for `access_token`.
    pub async fn me(&self, access_token: &str) -> Result<UserData, ClientError> {
        let response = self
            .http
            .get(self.config.endpoint(ME_PATH))
            .timeout(self.config.timeout)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %body, "profile fetch rejected");
            return Err(ClientError::Http {
                status: status.as_u16(),
                message: "Failed to fetch user data".into(),
            });
        }
        decode_json(response).await
    }

    /// Updates the profile with the provided fields.
    pub async fn update_me(
        &self,
        access_token: &str,
        update: ProfileUpdate,
    ) -> Result<UserData, ClientError> {
        let request = self
            .http
            .put(self.config.endpoint(ME_PATH))
            .timeout(self.config.timeout)
            .bearer_auth(access_token)
            .multipart(update.into_form()?);
        send_json(request, "Update failed").await
    }

    /// Public URL of a stored avatar, or `None` when no avatar is set.
    pub fn avatar_url(&self, avatar_path: &str) -> Option<String> {
        let file_id = avatar_path.rsplit('/').next().filter(|id| !id.is_empty())?;
        Some(self.config.endpoint(&format!("{AVATAR_PATH}/{file_id}")))
    }
}
