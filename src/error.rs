use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandBridgeError {
    #[error("command already mapped: {0}")]
    DuplicateCommand(String),
    #[error("function name already in use: {0}")]
    DuplicateFunction(String),
    #[error("invalid function name: {0}")]
    InvalidFunctionName(String),
    #[error("invalid command name: {0}")]
    InvalidCommandName(String),
    #[error("no mapping for command: {0}")]
    NotFound(String),
    #[error("missing execution context: {0}")]
    MissingContext(String),
    #[error("command dispatch unavailable: {0}")]
    DispatchUnavailable(String),
    #[error("invocation cancelled: {0}")]
    Cancelled(String),
    #[error("bridge is disabled")]
    Disabled,
    #[error("configuration error: {0}")]
    Config(String),
}

pub use crate::Result;
