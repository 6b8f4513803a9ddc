use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConciergeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("{service} API error ({status}): {body}")]
    RemoteService {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConciergeError {
    /// HTTP status reported by the provider, if this error came from one.
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            ConciergeError::RemoteService { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConciergeError>;
