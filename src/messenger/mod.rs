//! Platform-facing layer: outbound gateway and the inbound webhook server.

pub mod gateway;
pub mod webhook;

pub use gateway::{GraphGateway, MessagingGateway};
pub use webhook::run_webhook_server;

use crate::commands::ResponsePayload;

/// Render one reply payload through the gateway.
///
/// Image-send failure is non-fatal: the caption is retried as plain text
/// so the user always gets something. Send failures are logged only.
pub async fn deliver(gateway: &dyn MessagingGateway, recipient_id: &str, payload: &ResponsePayload) {
    match payload {
        ResponsePayload::Text(text) => {
            if let Err(e) = gateway.send(recipient_id, text).await {
                log::error!("Failed to send reply to {recipient_id}: {e}");
            }
        }
        ResponsePayload::Image { url, caption } => {
            if let Err(e) = gateway.send_image(recipient_id, url, caption).await {
                log::warn!("Image send to {recipient_id} failed ({e}), falling back to caption");
                if let Err(e) = gateway.send(recipient_id, caption).await {
                    log::error!("Caption fallback to {recipient_id} also failed: {e}");
                }
            }
        }
    }
}
