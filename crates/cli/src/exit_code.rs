// Consistent exit codes for the redline CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error (including invalid config)
//   11 = authentication error
//   12 = suggestion span no longer in the document
//   13 = network error

use std::process;

use redline_engine::config::ConfigError;
use redline_engine::error::SuggestError;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    Auth = 11,
    Conflict = 12,
    Network = 13,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(suggest_err) = cause.downcast_ref::<SuggestError>() {
                return Self::from_suggest_error(suggest_err);
            }
            if cause.downcast_ref::<ConfigError>().is_some() {
                return Self::Usage;
            }
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
                return match io_err.kind() {
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::ConnectionRefused => {
                        Self::Network
                    }
                    _ => Self::Error,
                };
            }
        }

        Self::Error
    }

    pub fn from_suggest_error(err: &SuggestError) -> Self {
        match err {
            SuggestError::Transport { status: Some(401 | 403), .. } => Self::Auth,
            SuggestError::Transport { .. } => Self::Network,
            SuggestError::SpanNotFound(_) => Self::Conflict,
            _ => Self::Error,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}
