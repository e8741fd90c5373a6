use thiserror::Error;

pub type Result<T> = std::result::Result<T, TlsConfigError>;

#[derive(Error, Debug)]
pub enum TlsConfigError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Crypto initialization error: {0}")]
    CryptoInit(String),
}

/// Category of a [`TlsConfigError`], for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Decode,
    CryptoInit,
}

impl TlsConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TlsConfigError::Configuration(_) => ErrorKind::Configuration,
            TlsConfigError::Decode(_) => ErrorKind::Decode,
            TlsConfigError::CryptoInit(_) => ErrorKind::CryptoInit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            TlsConfigError::Configuration("missing".to_string()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(TlsConfigError::Decode("bad".to_string()).kind(), ErrorKind::Decode);
        assert_eq!(
            TlsConfigError::CryptoInit("no provider".to_string()).kind(),
            ErrorKind::CryptoInit
        );
    }
}
