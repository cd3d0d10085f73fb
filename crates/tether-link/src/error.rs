// ABOUTME: Error types for link acquisition using thiserror.
// ABOUTME: LinkError covers config, HTTP, discovery and console failures; VerifyError one code attempt.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while acquiring a link.
#[derive(Error, Debug)]
pub enum LinkError {
    /// Failed to read the config file from disk.
    #[error("failed to read config from {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the config file.
    #[error("failed to parse config from {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Failed to serialize the config before writing it back.
    #[error("failed to serialize config: {0}")]
    SerializeConfig(#[source] toml::ser::Error),

    /// Failed to write the config file.
    #[error("failed to write config to {path}: {source}")]
    WriteConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config has no usable server endpoint.
    #[error("server.endpoint is required in the config file")]
    MissingEndpoint,

    /// Failed to build the HTTP client.
    #[error("failed to create HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Discovery could not run.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// Reading from or writing to the interactive console failed.
    #[error("console error: {0}")]
    Console(#[from] std::io::Error),

    /// The user interrupted the process.
    #[error("interrupted")]
    Interrupted,
}

/// Why a single verification-code attempt did not link the device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The code was empty or whitespace; nothing was sent.
    #[error("no verification code supplied")]
    EmptyCode,

    /// The server refused the code (expired or mistyped).
    #[error("server rejected the code ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The server could not be reached or answered with garbage.
    #[error("could not reach the server: {0}")]
    Transport(String),

    /// The server accepted the code but the token could not be saved locally.
    #[error("could not save the account token: {0}")]
    Persist(String),
}

/// Result type alias using LinkError.
pub type Result<T> = std::result::Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_read_config_error_display() {
        let err = LinkError::ReadConfig {
            path: PathBuf::from("/etc/tether/link.toml"),
            source: io::Error::new(io::ErrorKind::NotFound, "file not found"),
        };
        let display = err.to_string();
        assert!(display.contains("failed to read config"));
        assert!(display.contains("/etc/tether/link.toml"));
    }

    #[test]
    fn test_parse_config_error_has_source() {
        use std::error::Error;

        let source = toml::from_str::<toml::Table>("server = [").unwrap_err();
        let err = LinkError::ParseConfig {
            path: PathBuf::from("link.toml"),
            source,
        };
        assert!(err.to_string().contains("failed to parse config"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_console_error_from_io() {
        let err: LinkError = io::Error::new(io::ErrorKind::BrokenPipe, "stdin closed").into();
        assert!(matches!(err, LinkError::Console(_)));
        assert!(err.to_string().contains("stdin closed"));
    }

    #[test]
    fn test_verify_error_display() {
        let err = VerifyError::Rejected {
            status: 400,
            body: "invalid code".to_string(),
        };
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("invalid code"));
        assert_eq!(
            VerifyError::EmptyCode.to_string(),
            "no verification code supplied"
        );
    }

    #[test]
    fn test_error_no_source_interrupted() {
        use std::error::Error;

        assert!(LinkError::Interrupted.source().is_none());
        assert!(LinkError::MissingEndpoint.source().is_none());
    }
}
