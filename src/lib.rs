pub mod admin;
pub mod bindings;
pub mod bridge;
pub mod capture;
pub mod config;
pub mod error;
pub mod interfaces;
pub mod logging;
pub mod migration;
pub mod registrar;
pub mod synthesizer;

pub use crate::error::CommandBridgeError;

pub type Result<T> = std::result::Result<T, CommandBridgeError>;
