//! Outbound send API.
//!
//! The core only ever talks to [`MessagingGateway`]; the production
//! implementation posts to the platform Graph send endpoint. Tests swap in
//! a recording gateway.

use async_trait::async_trait;
use serde_json::json;

use crate::core::config;
use crate::core::error::{AppError, AppResult};

/// Abstract outbound send interface of the chat platform
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Send a plain text message
    async fn send(&self, recipient_id: &str, text: &str) -> AppResult<()>;

    /// Send an image with a caption
    async fn send_image(&self, recipient_id: &str, url: &str, caption: &str) -> AppResult<()>;
}

/// Graph send API implementation
pub struct GraphGateway {
    http: reqwest::Client,
    api_url: String,
    access_token: String,
}

impl GraphGateway {
    pub fn new(api_url: String, access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            access_token,
        }
    }

    pub fn from_env() -> Self {
        Self::new(
            config::SEND_API_URL.clone(),
            config::PAGE_ACCESS_TOKEN.clone(),
        )
    }

    async fn post(&self, recipient_id: &str, message: serde_json::Value) -> AppResult<()> {
        if self.access_token.is_empty() {
            return Err(AppError::Send("PAGE_ACCESS_TOKEN is not set".to_string()));
        }

        let body = json!({
            "recipient": { "id": recipient_id },
            "message": message,
        });

        let response = self
            .http
            .post(&self.api_url)
            .query(&[("access_token", self.access_token.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AppError::HttpStatus(status))
        }
    }
}

#[async_trait]
impl MessagingGateway for GraphGateway {
    async fn send(&self, recipient_id: &str, text: &str) -> AppResult<()> {
        self.post(recipient_id, json!({ "text": text })).await
    }

    async fn send_image(&self, recipient_id: &str, url: &str, caption: &str) -> AppResult<()> {
        self.post(
            recipient_id,
            json!({
                "attachment": {
                    "type": "image",
                    "payload": { "url": url, "is_reusable": true }
                }
            }),
        )
        .await?;
        if !caption.is_empty() {
            self.post(recipient_id, json!({ "text": caption })).await?;
        }
        Ok(())
    }
}
