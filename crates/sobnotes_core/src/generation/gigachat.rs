//! GigaChat-backed note generator.
//!
//! # Responsibility
//! - Exchange client credentials for a bearer token.
//! - Request one chat completion for the note prompt.
//!
//! # Invariants
//! - Credentials are read at call time; a missing value fails with
//!   `GenerationError::Config` before any network I/O.
//! - Credentials and generated text are never logged.

use super::{GenerationError, GenerationResult, NoteGenerator};
use crate::model::note::Note;
use async_trait::async_trait;
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const DEFAULT_OAUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";
pub const DEFAULT_CHAT_URL: &str = "https://gigachat.devices.sberbank.ru/api/v1/chat/completions";
pub const DEFAULT_SCOPE: &str = "GIGACHAT_API_PERS";
pub const DEFAULT_MODEL: &str = "GigaChat";
const AUTH_TIMEOUT: Duration = Duration::from_secs(30);
const CHAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection and credential settings for [`GigaChatClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GigaChatSettings {
    /// Base64 `client_id:client_secret` pair sent as Basic auth.
    pub credentials: Option<String>,
    /// Sent as `RqUID`; a fresh UUID is used per request when unset.
    pub client_secret: Option<String>,
    pub scope: String,
    pub model: String,
    pub oauth_url: String,
    pub chat_url: String,
    /// The public endpoints use a national CA missing from common trust stores.
    pub accept_invalid_certs: bool,
    pub auth_timeout: Duration,
    pub chat_timeout: Duration,
}

impl Default for GigaChatSettings {
    fn default() -> Self {
        Self {
            credentials: None,
            client_secret: None,
            scope: DEFAULT_SCOPE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            oauth_url: DEFAULT_OAUTH_URL.to_string(),
            chat_url: DEFAULT_CHAT_URL.to_string(),
            accept_invalid_certs: false,
            auth_timeout: AUTH_TIMEOUT,
            chat_timeout: CHAT_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatRequestMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

/// HTTP client for the GigaChat OAuth + chat completion endpoints.
pub struct GigaChatClient {
    http: Client,
    settings: GigaChatSettings,
}

impl GigaChatClient {
    /// Builds the HTTP client. Fails only when TLS setup fails.
    pub fn new(settings: GigaChatSettings) -> GenerationResult<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .map_err(|err| GenerationError::Config(format!("http client setup failed: {err}")))?;
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &GigaChatSettings {
        &self.settings
    }

    fn request_id(&self) -> String {
        self.settings
            .client_secret
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    async fn fetch_access_token(&self, credentials: &str) -> GenerationResult<String> {
        let response = self
            .http
            .post(&self.settings.oauth_url)
            .header("Accept", "application/json")
            .header("RqUID", self.request_id())
            .header("Authorization", format!("Basic {credentials}"))
            .form(&[("scope", self.settings.scope.as_str())])
            .timeout(self.settings.auth_timeout)
            .send()
            .await
            .map_err(|err| GenerationError::Transport(format!("oauth request: {err}")))?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(GenerationError::Config(format!(
                "credentials rejected by oauth endpoint (HTTP {status})"
            )));
        }
        if !status.is_success() {
            return Err(GenerationError::Transport(format!("oauth HTTP {status}")));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| GenerationError::Response(format!("oauth body: {err}")))?;
        body.access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| GenerationError::Response("oauth body has no access_token".to_string()))
    }

    async fn complete(&self, token: &str, prompt: &str) -> GenerationResult<String> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: [ChatRequestMessage {
                role: "user",
                content: prompt,
            }],
        };
        let response = self
            .http
            .post(&self.settings.chat_url)
            .header("Accept", "application/json")
            .header("RqUID", self.request_id())
            .bearer_auth(token)
            .json(&request)
            .timeout(self.settings.chat_timeout)
            .send()
            .await
            .map_err(|err| GenerationError::Transport(format!("chat request: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Transport(format!("chat HTTP {status}")));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| GenerationError::Response(format!("chat body: {err}")))?;
        extract_content(body)
    }
}

#[async_trait]
impl NoteGenerator for GigaChatClient {
    async fn generate(&self, query: &str) -> GenerationResult<Note> {
        let credentials = self
            .settings
            .credentials
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| GenerationError::Config("GIGACHAT_CREDENTIALS is not set".to_string()))?;

        let started_at = Instant::now();
        let result = async {
            let token = self.fetch_access_token(credentials).await?;
            self.complete(&token, &build_prompt(query)).await
        }
        .await;

        match result {
            Ok(body) => {
                info!(
                    "event=gigachat_generate module=generation status=ok duration_ms={} body_len={}",
                    started_at.elapsed().as_millis(),
                    body.len()
                );
                Ok(Note::new(query.trim(), body))
            }
            Err(err) => {
                warn!(
                    "event=gigachat_generate module=generation status=error duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                Err(err)
            }
        }
    }
}

/// Embeds the query into the fixed instruction sent to the model.
pub fn build_prompt(query: &str) -> String {
    format!(
        "You are an expert in IT and software engineering. Answer briefly and to the point: \
         what it is, where it is used and anything else worth knowing, formatted as Markdown. \
         Request: «{}»",
        query.trim()
    )
}

fn extract_content(body: ChatResponse) -> GenerationResult<String> {
    let content = body
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .map(|message| message.content)
        .ok_or_else(|| GenerationError::Response("response has no choices".to_string()))?;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::Response("generated content is empty".to_string()));
    }
    Ok(trimmed.to_string())
}
