//! Error types for the OakBase client SDK.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Invalid URL: {0}")]
  Url(String),

  #[error("Authentication failed: {0}")]
  Auth(String),

  #[error("Server error ({status}): {message}")]
  Server { status: u16, message: String },

  #[error("Serialization error: {0}")]
  Serialization(String),

  #[error("Invalid filter value: {0}")]
  InvalidFilterValue(String),

  #[error("Unsupported operator: {0}")]
  UnsupportedOperator(String),

  #[error("Realtime error: {0}")]
  Realtime(String),

  #[error("Channel closed")]
  ChannelClosed,
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Self::Serialization(e.to_string())
  }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
  fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
    Self::Realtime(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, Error>;
