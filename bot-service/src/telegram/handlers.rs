use std::sync::Arc;

use async_trait::async_trait;
use shared::errors::{Result, ServiceError};
use shared::{Action, InboundEvent, UserId};
use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};
use workflow_service::{DispatchOutcome, Dispatcher as WorkflowDispatcher, ReplySender};

use crate::telegram::{format_action, make_options_keyboard, resolve_option};

fn map_teloxide_err<E: std::fmt::Display>(e: E) -> ServiceError {
    ServiceError::Telegram(e.to_string())
}

/// Sends workflow replies into one Telegram chat.
pub struct TelegramReplier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramReplier {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl ReplySender for TelegramReplier {
    async fn send(&self, _user_id: &UserId, actions: &[Action]) -> Result<()> {
        for action in actions {
            let request = self.bot.send_message(self.chat_id, format_action(action));
            let sent = match make_options_keyboard(&action.options) {
                Some(keyboard) => request.reply_markup(keyboard).await,
                None => request.await,
            };
            sent.map_err(map_teloxide_err)?;
        }
        Ok(())
    }
}

pub async fn handle_message(
    bot: Bot,
    msg: Message,
    workflow: Arc<WorkflowDispatcher>,
) -> Result<()> {
    let (Some(text), Some(from)) = (msg.text(), msg.from.as_ref()) else {
        return Ok(());
    };

    let user_id = UserId::new(from.id.0.to_string());
    let replier = TelegramReplier::new(bot, msg.chat.id);

    dispatch_text(&workflow, user_id, text, &replier).await
}

/// Inline keyboard taps are answered up front so the client's spinner stops
/// even when the workflow reply fails. The tapped button's label is fed to
/// the workflow exactly as if the user had typed it.
pub async fn handle_callback_query(
    bot: Bot,
    q: CallbackQuery,
    workflow: Arc<WorkflowDispatcher>,
) -> Result<()> {
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        tracing::warn!(error = %e, "Failed to answer callback query");
    }

    let (Some(data), Some(msg)) = (&q.data, &q.message) else {
        return Ok(());
    };

    let Some(text) = msg
        .regular_message()
        .and_then(|m| m.reply_markup())
        .and_then(|markup| resolve_option(markup, data))
    else {
        tracing::warn!(data = %data, "Callback data does not match any keyboard option");
        return Ok(());
    };

    let user_id = UserId::new(q.from.id.0.to_string());
    let replier = TelegramReplier::new(bot, msg.chat().id);

    dispatch_text(&workflow, user_id, &text, &replier).await
}

async fn dispatch_text(
    workflow: &WorkflowDispatcher,
    user_id: UserId,
    text: &str,
    replier: &TelegramReplier,
) -> Result<()> {
    let event = InboundEvent::new(user_id.clone(), text);

    match workflow.dispatch(event, replier).await? {
        DispatchOutcome::Suppressed => {
            tracing::debug!(user_id = %user_id, "Telegram update ignored as duplicate");
        }
        DispatchOutcome::Processed { step, completed, .. } => {
            tracing::info!(
                user_id = %user_id,
                step = %step,
                completed = completed.is_some(),
                "Telegram update processed"
            );
        }
    }

    Ok(())
}
