use async_trait::async_trait;

use crate::bindings::CommandName;
use crate::error::Result;

/// One callable declared to the host's function-call system. Every
/// function takes a single free-text `args` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub description: String,
    pub arg_description: String,
    pub command_name: CommandName,
}

#[async_trait]
pub trait FunctionHost: Send + Sync {
    /// Atomically replaces the previously declared function set: earlier
    /// declarations are dropped and the new set applied in one step, so
    /// callers never observe a half-registered surface.
    async fn replace_functions(&self, functions: Vec<FunctionDecl>) -> Result<()>;
}
