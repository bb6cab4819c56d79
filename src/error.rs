use thiserror::Error;

#[derive(Debug, Error)]
pub enum FountainError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("system not determined: rank {rank} of {required}")]
    NotDetermined { rank: usize, required: usize },
    #[error("payload size mismatch: expected {expected} bytes, got {got}")]
    PayloadSize { expected: usize, got: usize },
    #[error("batch mismatch: {0}")]
    BatchMismatch(String),
    #[error("decoder lock poisoned")]
    LockPoisoned,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl FountainError {
    pub fn config(reason: impl Into<String>) -> Self {
        FountainError::InvalidConfiguration(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, FountainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = FountainError::NotDetermined {
            rank: 5,
            required: 7,
        };
        assert_eq!(err.to_string(), "system not determined: rank 5 of 7");

        let err = FountainError::PayloadSize {
            expected: 10,
            got: 9,
        };
        assert_eq!(
            err.to_string(),
            "payload size mismatch: expected 10 bytes, got 9"
        );

        let err = FountainError::config("source_symbols must be at least 1");
        assert!(err.to_string().starts_with("invalid configuration"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: FountainError = io.into();
        assert!(matches!(err, FountainError::Io(_)));
    }
}
