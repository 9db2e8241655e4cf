use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::message::NotificationMessage;

/// Delivers a message to a slash command's `response_url`.
///
/// Delivery is fire-and-forget: failures are logged and never reach the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, response_url: &str, message: &NotificationMessage);
}

pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, response_url: &str, message: &NotificationMessage) {
        let attachments = message.attachments.len();
        match self.client.post(response_url).json(message).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(
                    event_name = "slack.notify.delivered",
                    status = %response.status(),
                    attachments,
                    "slash command response delivered"
                );
            }
            Ok(response) => {
                warn!(
                    event_name = "slack.notify.rejected",
                    status = %response.status(),
                    attachments,
                    "slack rejected slash command response"
                );
            }
            Err(error) => {
                warn!(
                    event_name = "slack.notify.failed",
                    error = %error,
                    attachments,
                    "failed to post slash command response"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Notifier, WebhookNotifier};
    use crate::message::{Attachment, NotificationMessage};

    #[tokio::test]
    async fn unreachable_response_url_is_swallowed() {
        let notifier = WebhookNotifier::new(Duration::from_millis(200)).expect("client");
        let message = NotificationMessage::new().attachment(Attachment::new().title("t"));

        notifier.notify("http://127.0.0.1:1/response", &message).await;
        notifier.notify("not a url", &message).await;
    }
}
