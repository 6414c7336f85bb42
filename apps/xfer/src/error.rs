//! CLI error handling

use std::fmt;

use xfer_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration, client setup or other library error
    Xfer(xfer_errors::Error),
    /// Invalid command arguments
    InvalidArguments(String),
    /// The server or transport reported a failed transfer
    Transfer { status: u16, message: String },
    /// A cached acquisition produced nothing
    Acquisition { kind: String, url: String },
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Xfer(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Transfer { status, message } if *status == 0 => {
                write!(f, "Transfer failed: {message}")
            }
            CliError::Transfer { status, message } => {
                write!(f, "Transfer failed with status {status}: {message}")
            }
            CliError::Acquisition { kind, url } => write!(f, "Could not acquire {kind} from {url}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Xfer(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<xfer_errors::Error> for CliError {
    fn from(e: xfer_errors::Error) -> Self {
        CliError::Xfer(e)
    }
}

impl From<xfer_errors::ConfigError> for CliError {
    fn from(e: xfer_errors::ConfigError) -> Self {
        CliError::Xfer(e.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_display() {
        let err = CliError::Transfer {
            status: 401,
            message: "Invalid Credentials".into(),
        };
        assert_eq!(
            err.to_string(),
            "Transfer failed with status 401: Invalid Credentials"
        );

        let err = CliError::Transfer {
            status: 0,
            message: "Request aborted".into(),
        };
        assert_eq!(err.to_string(), "Transfer failed: Request aborted");
    }

    #[test]
    fn test_config_error_has_code() {
        let err: CliError = xfer_errors::ConfigError::InvalidValue {
            field: "XFER_TIMEOUT".into(),
            value: "soon".into(),
        }
        .into();
        assert!(err.to_string().contains("Code:"));
    }
}
