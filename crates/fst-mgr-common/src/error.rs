//! Errors shared by the FST manager components.

use std::io;
use thiserror::Error;

pub type FstMgrResult<T> = Result<T, FstMgrError>;

/// Failure of a command, a command template or an interface driver call.
#[derive(Debug, Error)]
pub enum FstMgrError {
    /// The shell could not be started.
    #[error("Cannot spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The command ran and exited unsuccessfully. `status` is `None` when
    /// it was killed by a signal.
    #[error("'{command}' exited with {}: {stderr}", exit_status(.status))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// A template names a placeholder with no binding.
    #[error("Template '{template}' uses unknown placeholder {placeholder}")]
    Template {
        template: String,
        /// Placeholder including braces, e.g. `{bogus}`
        placeholder: String,
    },

    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    /// An interface driver operation failed.
    #[error("Driver operation {operation} failed on {iface}: {message}")]
    Driver {
        operation: String,
        iface: String,
        message: String,
    },
}

fn exit_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "signal".to_string(),
    }
}

impl FstMgrError {
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn driver(
        operation: impl Into<String>,
        iface: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Driver {
            operation: operation.into(),
            iface: iface.into(),
            message: message.into(),
        }
    }
}
