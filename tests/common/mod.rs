//! Shared test fixtures: a recording gateway and state construction.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use kaiwa::core::error::{AppError, AppResult};
use kaiwa::genai::GenClient;
use kaiwa::messenger::MessagingGateway;
use kaiwa::state::AppState;

/// One outbound call captured by the recording gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text { recipient: String, text: String },
    Image { recipient: String, url: String, caption: String },
}

/// Gateway that records every send; can be told to fail image sends
/// or sends to a given recipient.
pub struct RecordingGateway {
    pub sent: Mutex<Vec<Sent>>,
    pub fail_images: AtomicBool,
    pub fail_recipient: Mutex<Option<String>>,
}

impl RecordingGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail_images: AtomicBool::new(false),
            fail_recipient: Mutex::new(None),
        })
    }

    pub fn texts_to(&self, recipient: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Text { recipient: r, text } if r == recipient => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send(&self, recipient_id: &str, text: &str) -> AppResult<()> {
        if self.fail_recipient.lock().unwrap().as_deref() == Some(recipient_id) {
            return Err(AppError::Send("recipient blocked the bot".to_string()));
        }
        self.sent.lock().unwrap().push(Sent::Text {
            recipient: recipient_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_image(&self, recipient_id: &str, url: &str, caption: &str) -> AppResult<()> {
        if self.fail_images.load(Ordering::SeqCst) {
            return Err(AppError::Send("image upload rejected".to_string()));
        }
        self.sent.lock().unwrap().push(Sent::Image {
            recipient: recipient_id.to_string(),
            url: url.to_string(),
            caption: caption.to_string(),
        });
        Ok(())
    }
}

/// State with no generation backends and a single admin `admin1`
pub fn test_state(gateway: Arc<RecordingGateway>) -> Arc<AppState> {
    AppState::with_admins(
        gateway,
        GenClient::new(Vec::new()),
        vec!["admin1".to_string()],
    )
}
