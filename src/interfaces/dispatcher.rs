use std::fmt;

use async_trait::async_trait;

use crate::error::Result;

/// Identifier tying a dispatched command to its capture window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvocationId(pub u64);

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inv-{}", self.0)
    }
}

/// Resolved identity of the session a call originates from.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub wake_prefix: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
}

impl SessionContext {
    pub fn new(session_id: &str, wake_prefix: &str, sender_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            wake_prefix: wake_prefix.to_string(),
            sender_id: sender_id.to_string(),
            sender_name: None,
        }
    }
}

/// A synthesized command line handed to the host command processor.
#[derive(Debug, Clone)]
pub struct CommandSubmission {
    pub invocation: InvocationId,
    pub session_id: String,
    pub command_line: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
}

#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    /// Hands a command line to the host for execution against the
    /// originating session. Must return without waiting on the command's
    /// side effects; output arrives asynchronously through the capture
    /// router, keyed by `submission.invocation`.
    async fn submit(&self, submission: CommandSubmission) -> Result<()>;
}

#[async_trait]
pub trait ConversationSink: Send + Sync {
    async fn send_text(&self, session_id: &str, text: &str) -> Result<()>;
}
