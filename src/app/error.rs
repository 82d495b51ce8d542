use thiserror::Error;

use crate::domain::Platform;

#[derive(Error, Debug)]
pub enum RankError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Call timed out after {0} seconds")]
    Timeout(u64),

    #[error("Transient upstream failure: {0}")]
    Transient(String),

    #[error("Permanent upstream failure: {0}")]
    Permanent(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(i64),

    #[error("No connector configured for platform: {0}")]
    NoConnector(Platform),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl RankError {
    /// Whether this failure is worth retrying behind the rate gate.
    ///
    /// Timeouts, connect errors, rate-limit and server-side HTTP statuses
    /// are transient; everything else (bad credential, malformed query,
    /// database errors) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            RankError::Timeout(_) | RankError::Transient(_) => true,
            RankError::Http(e) => {
                if e.is_timeout() || e.is_connect() {
                    return true;
                }
                match e.status() {
                    Some(status) => status.as_u16() == 429 || status.is_server_error(),
                    None => false,
                }
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RankError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(RankError::Timeout(10).is_transient());
        assert!(RankError::Transient("rate limited".into()).is_transient());
        assert!(!RankError::Permanent("bad key".into()).is_transient());
        assert!(!RankError::ChannelNotFound(1).is_transient());
        assert!(!RankError::Config("missing".into()).is_transient());
    }
}
