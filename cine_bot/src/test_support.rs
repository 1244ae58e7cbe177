#![allow(clippy::unwrap_used)]

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;
use teloxide::{
    types::{ChatId, MessageId},
    ApiError, RequestError,
};

use crate::messenger::Messenger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text(ChatId, String),
    Delivery {
        to: ChatId,
        from_chat: ChatId,
        message_id: MessageId,
        protect: bool,
    },
}

/// Records everything instead of sending it. Chats in `blocked` fail like a
/// user that blocked the bot.
#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<Sent>>,
    pub blocked: Mutex<HashSet<ChatId>>,
}

impl RecordingMessenger {
    pub fn new() -> Arc<RecordingMessenger> {
        Arc::new(RecordingMessenger::default())
    }

    pub fn block(&self, chat: ChatId) {
        self.blocked.lock().unwrap().insert(chat);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_to(&self, chat: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Text(to, text) if to == chat => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, to: ChatId, sent: Sent) -> Result<(), RequestError> {
        if self.blocked.lock().unwrap().contains(&to) {
            return Err(RequestError::Api(ApiError::BotBlocked));
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }
}

impl Messenger for RecordingMessenger {
    fn send_text(&self, to: ChatId, text: String) -> BoxFuture<'_, Result<(), RequestError>> {
        let result = self.record(to, Sent::Text(to, text));
        Box::pin(async move { result })
    }

    fn deliver(
        &self,
        to: ChatId,
        from_chat: ChatId,
        message_id: MessageId,
        protect: bool,
    ) -> BoxFuture<'_, Result<(), RequestError>> {
        let result = self.record(
            to,
            Sent::Delivery {
                to,
                from_chat,
                message_id,
                protect,
            },
        );
        Box::pin(async move { result })
    }
}
