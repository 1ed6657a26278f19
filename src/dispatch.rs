use crate::config::Config;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_ERROR_BODY_BYTES: usize = 1024;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("не удалось создать HTTP-клиент: {0}")]
    Client(#[source] reqwest::Error),
    #[error("ошибка запроса к API: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("api status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Payload<'a> {
    pub chat_id: &'a str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<&'a str>,
}

/// Sends one rendered message to the notification API. One attempt, no retry.
pub struct Dispatcher {
    client: Client,
    url: String,
    token: String,
    chat_id: String,
    message_thread_id: Option<String>,
}

impl Dispatcher {
    pub fn new(cfg: &Config) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .user_agent(concat!("hostprobe/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(DispatchError::Client)?;
        Ok(Self {
            client,
            url: cfg.api_url.clone(),
            token: cfg.api_token.clone(),
            chat_id: cfg.chat_id.clone(),
            message_thread_id: cfg.message_thread_id.clone(),
        })
    }

    pub fn payload<'a>(&'a self, message: &'a str) -> Payload<'a> {
        Payload {
            chat_id: &self.chat_id,
            message,
            message_thread_id: self.message_thread_id.as_deref(),
        }
    }

    pub async fn send(&self, message: &str) -> Result<(), DispatchError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&self.payload(message))
            .send()
            .await
            .map_err(DispatchError::Transport)?;

        let status = resp.status();
        if status.is_success() {
            info!(status = status.as_u16(), "оповещение отправлено");
            return Ok(());
        }

        let body = read_error_body(resp).await;
        Err(DispatchError::Status { status, body })
    }
}

async fn read_error_body(mut resp: reqwest::Response) -> String {
    let mut buf = Vec::new();
    while buf.len() < MAX_ERROR_BODY_BYTES {
        match resp.chunk().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            Ok(None) | Err(_) => break,
        }
    }
    buf.truncate(MAX_ERROR_BODY_BYTES);
    String::from_utf8_lossy(&buf).trim().to_string()
}
