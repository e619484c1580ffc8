use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Conversation error: {0}")]
    Conversation(anyhow::Error),

    #[error("Message has no sender")]
    NoSender,

    #[error("User id out of range: {0}")]
    InvalidUserId(u64),
}
