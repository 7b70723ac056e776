use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// The provider answered but has nothing usable for the symbol.
    #[error("no market data available for `{ticker}`: {reason}")]
    DataUnavailable { ticker: String, reason: String },
    /// The provider call itself failed (network, auth, rate limit, bad payload).
    #[error("market data provider error: {0}")]
    Provider(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Chrono(#[from] chrono::ParseError),
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Notify(#[from] notify::Error),
    #[error("operation cancelled by user")]
    Cancelled,
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        AppError::Message(msg.into())
    }

    pub fn unavailable<T: Into<String>, R: Into<String>>(ticker: T, reason: R) -> Self {
        AppError::DataUnavailable {
            ticker: ticker.into(),
            reason: reason.into(),
        }
    }

    pub fn provider<T: Into<String>>(msg: T) -> Self {
        AppError::Provider(msg.into())
    }

    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, AppError::DataUnavailable { .. })
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, AppError::Provider(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Provider(format!("request timed out: {err}"))
        } else {
            AppError::Provider(err.to_string())
        }
    }
}
