use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Bot file error: {0}")]
    BotFile(String),

    #[error("Recognizer error: {0}")]
    Recognizer(String),

    #[error("Turn cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
