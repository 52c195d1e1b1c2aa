#[derive(thiserror::Error, Debug)]
pub enum DomError {
    #[error("Node is detached from the document: {0}")]
    Detached(String),
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Preference file is corrupt: {0}")]
    Corrupt(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_message_names_node() {
        let err = DomError::Detached("NodeId(3, 1)".into());
        assert_eq!(
            err.to_string(),
            "Node is detached from the document: NodeId(3, 1)"
        );
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: StoreError = io.into();
        assert!(matches!(err, StoreError::IoError(_)));
    }

    #[test]
    fn config_error_quotes_value() {
        let err = ConfigError::InvalidValue {
            key: "HOVER_SPEECH_RATE",
            value: "fast".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for HOVER_SPEECH_RATE: \"fast\""
        );
    }
}
