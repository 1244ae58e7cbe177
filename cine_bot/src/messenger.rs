//! Outbound messages. Everything that talks to users outside of a direct
//! reply goes through [`Messenger`], so it can be swapped out in tests.

use bot_commons::teloxide_retry;
use futures::future::BoxFuture;
use teloxide::{
    prelude::*,
    types::{MessageId, ParseMode},
    RequestError,
};

pub trait Messenger: Send + Sync {
    /// Send an HTML formatted text message.
    fn send_text(&self, to: ChatId, text: String) -> BoxFuture<'_, Result<(), RequestError>>;

    /// Forward a channel post to `to`. If `protect` is set, the recipient
    /// can't forward or save it further.
    fn deliver(
        &self,
        to: ChatId,
        from_chat: ChatId,
        message_id: MessageId,
        protect: bool,
    ) -> BoxFuture<'_, Result<(), RequestError>>;
}

impl Messenger for Bot {
    fn send_text(&self, to: ChatId, text: String) -> BoxFuture<'_, Result<(), RequestError>> {
        Box::pin(async move {
            teloxide_retry!(
                self.send_message(to, &text)
                    .parse_mode(ParseMode::Html)
                    .await
            )
            .map(|_| ())
        })
    }

    fn deliver(
        &self,
        to: ChatId,
        from_chat: ChatId,
        message_id: MessageId,
        protect: bool,
    ) -> BoxFuture<'_, Result<(), RequestError>> {
        Box::pin(async move {
            teloxide_retry!(
                self.forward_message(to, from_chat, message_id)
                    .protect_content(protect)
                    .await
            )
            .map(|_| ())
        })
    }
}

/// Send a notification that nobody waits on. Failure is only logged.
pub async fn notify(messenger: &dyn Messenger, to: ChatId, text: String) -> bool {
    match messenger.send_text(to, text).await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Failed to notify {to}: {e}");
            false
        }
    }
}
