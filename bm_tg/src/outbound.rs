use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bm_session::ChatSender;
use bm_session::Identity;
use bm_session::Keyboard;
use bm_session::Strings;
use teloxide::ApiError;
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use teloxide::types::InputFile;
use teloxide::types::ParseMode;
use teloxide::types::UserId;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;

use crate::keyboard;
use crate::rate_limiter::RateLimiter;

const NETWORK_RETRY_DELAY: Duration = Duration::from_secs(1);

/// One queued delivery to a chat
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message { chat_id: ChatId, text: String, keyboard: Keyboard },
    Document { chat_id: ChatId, path: PathBuf, caption: String },
}

impl Outbound {
    pub fn chat_id(&self) -> ChatId {
        match self {
            Outbound::Message { chat_id, .. } | Outbound::Document { chat_id, .. } => *chat_id,
        }
    }
}

/// [`ChatSender`] for the session and scheduler threads: queues onto the sender task
#[derive(Clone)]
pub struct OutboundSender {
    tx: UnboundedSender<Outbound>,
}

impl OutboundSender {
    pub fn new(tx: UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }

    fn enqueue(&self, outbound: Outbound) {
        if self.tx.send(outbound).is_err() {
            tracing::warn!("Outbound sender gone, message dropped");
        }
    }
}

fn chat_of(identity: Identity) -> ChatId {
    ChatId::from(UserId(identity.0))
}

impl ChatSender for OutboundSender {
    fn send_message(&self, identity: Identity, text: String, keyboard: Keyboard) {
        self.enqueue(Outbound::Message { chat_id: chat_of(identity), text, keyboard });
    }

    fn send_document(&self, identity: Identity, path: PathBuf, caption: String) {
        self.enqueue(Outbound::Document { chat_id: chat_of(identity), path, caption });
    }
}

/// Deliver queued messages in order until every [`OutboundSender`] is dropped
pub async fn run_sender(bot: Bot, mut rx: UnboundedReceiver<Outbound>, rate_limiter: Arc<RateLimiter>, strings: Arc<dyn Strings>) {
    tracing::info!("Outbound sender started");

    while let Some(outbound) = rx.recv().await {
        let chat_id = outbound.chat_id();
        if rate_limiter.acquire(chat_id).await.is_err() {
            tracing::error!("Rate limiter closed");
            break;
        }
        if let Err(err) = send_with_retry(&bot, &outbound, &*strings).await {
            tracing::error!(%chat_id, "Failed to deliver message: {err}");
        }
    }

    tracing::info!("Outbound sender stopped");
}

/// Deliver, retrying once after Telegram's flood wait or a network error
async fn send_with_retry(bot: &Bot, outbound: &Outbound, strings: &dyn Strings) -> Result<(), RequestError> {
    match deliver(bot, outbound, strings).await {
        Ok(()) => Ok(()),
        Err(RequestError::RetryAfter(after)) => {
            tracing::warn!("Rate limited, waiting {after:?}");
            tokio::time::sleep(after.duration()).await;
            deliver(bot, outbound, strings).await
        }
        Err(RequestError::Network(err)) => {
            tracing::error!("Network error: {err}");
            tokio::time::sleep(NETWORK_RETRY_DELAY).await;
            deliver(bot, outbound, strings).await
        }
        Err(RequestError::Api(ApiError::BotBlocked)) => {
            tracing::warn!(chat_id = %outbound.chat_id(), "Bot was blocked by the user");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

async fn deliver(bot: &Bot, outbound: &Outbound, strings: &dyn Strings) -> Result<(), RequestError> {
    match outbound {
        Outbound::Message { chat_id, text, keyboard } => {
            let request = bot.send_message(*chat_id, text.clone()).parse_mode(ParseMode::Html);
            match keyboard::markup(*keyboard, strings) {
                Some(markup) => request.reply_markup(markup).await?,
                None => request.await?,
            };
        }
        Outbound::Document { chat_id, path, caption } => {
            bot.send_document(*chat_id, InputFile::file(path.clone())).caption(caption.clone()).await?;
        }
    }
    Ok(())
}
