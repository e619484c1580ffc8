use crate::command::{RESET_DONE, format_plan_report};
use crate::{Command, Error, Result, TelegramBot};
use async_trait::async_trait;
use dpdrbot_conversation::InboundMessage;
use dpdrbot_core::{OutboundMessage, ReplySink, UserId};
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, KeyboardButton, KeyboardMarkup, Message};
use tracing::{debug, info};

/// Delivers replies to one Telegram chat.
pub struct ChatSink {
    bot: Bot,
    chat_id: ChatId,
}

impl ChatSink {
    #[must_use]
    pub const fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl ReplySink for ChatSink {
    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
        let request = self.bot.send_message(self.chat_id, message.text);
        match message.keyboard {
            Some(rows) => {
                let keyboard = KeyboardMarkup::new(
                    rows.into_iter()
                        .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>()),
                )
                .one_time_keyboard()
                .resize_keyboard();
                request.reply_markup(keyboard).await?;
            }
            None => {
                request.await?;
            }
        }
        Ok(())
    }
}

fn sender_id(msg: &Message) -> Result<UserId> {
    let user = msg.from.as_ref().ok_or(Error::NoSender)?;
    UserId::try_from(user.id.0).map_err(|_| Error::InvalidUserId(user.id.0))
}

/// Handle bot commands
pub async fn handle_command(bot: TelegramBot, msg: Message, cmd: Command) -> Result<()> {
    let user_id = sender_id(&msg)?;
    let sink = ChatSink::new(bot.bot.clone(), msg.chat.id);
    info!("[{user_id}] Command: {cmd:?}");

    let reply = match cmd {
        Command::Reset => {
            bot.orchestrator.reset_session(user_id).await;
            OutboundMessage::text(RESET_DONE)
        }
        Command::Plan => {
            OutboundMessage::text(format_plan_report(&bot.orchestrator.plan_report(user_id)))
        }
        other => match other.static_reply() {
            Some(reply) => reply,
            None => return Ok(()),
        },
    };

    sink.send(reply).await.map_err(Error::Conversation)
}

/// Handle any message (commands or regular text)
pub async fn handle_message(bot: TelegramBot, msg: Message) -> Result<()> {
    let Some(text) = msg.text() else {
        debug!("Ignoring non-text message in chat {}", msg.chat.id);
        return Ok(());
    };

    if let Some(cmd) = Command::parse_from_text(text) {
        return handle_command(bot, msg, cmd).await;
    }
    if Command::is_command(text) {
        debug!("Ignoring unknown command {text:?} in chat {}", msg.chat.id);
        return Ok(());
    }

    let user_id = sender_id(&msg)?;
    let username = msg.from.as_ref().and_then(|u| u.username.clone());
    info!(
        "[@{}] Message: {text}",
        username.as_deref().unwrap_or("unknown")
    );

    bot.bot
        .send_chat_action(msg.chat.id, ChatAction::Typing)
        .await?;

    let sink = ChatSink::new(bot.bot.clone(), msg.chat.id);
    let inbound = InboundMessage::new(user_id, text).with_username(username);
    bot.orchestrator
        .on_message(inbound, &sink, &bot.cancel)
        .await
        .map_err(Error::Conversation)
}
