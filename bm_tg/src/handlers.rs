use bm_session::Identity;
use bm_session::InboundEvent;
use crossbeam_channel::Sender;
use teloxide::RequestError;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::UserId;

use crate::auth::AuthorizedUser;

/// Update handler: messages from the authorized user are forwarded to the session thread as text
pub fn schema(authorized: AuthorizedUser, event_tx: Sender<InboundEvent>) -> UpdateHandler<RequestError> {
    Update::filter_message()
        .filter_map(|update: Update| update.from().map(|user| user.id))
        .filter(move |user_id: UserId| {
            let allowed = authorized.is_authorized(&user_id);
            if !allowed {
                tracing::warn!("Unauthorized access attempt from user {user_id}");
            }
            allowed
        })
        .endpoint(move |msg: Message, user_id: UserId| {
            let event_tx = event_tx.clone();
            async move {
                forward(&event_tx, user_id, msg.text());
                respond(())
            }
        })
}

/// Queue a text message for the session thread; returns whether anything was queued
pub fn forward(event_tx: &Sender<InboundEvent>, user_id: UserId, text: Option<&str>) -> bool {
    let Some(text) = text else {
        tracing::debug!(%user_id, "Ignoring message without text");
        return false;
    };
    let event = InboundEvent { identity: Identity(user_id.0), text: text.to_string() };
    if event_tx.send(event).is_err() {
        tracing::error!("Session thread gone, message dropped");
        return false;
    }
    true
}
