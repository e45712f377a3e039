use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::bindings::Binding;
use crate::config::{ConfigHandle, ResponseMode};
use crate::error::{CommandBridgeError, Result};
use crate::interfaces::dispatcher::{
    CommandDispatcher, CommandSubmission, ConversationSink, InvocationId, SessionContext,
};
use crate::synthesizer::build_command_line;

/// An output event the host dispatcher emits for one invocation.
#[derive(Debug, Clone)]
pub enum OutputEvent {
    Chunk(String),
    /// Explicit no-more-output signal; optional, hosts without one rely
    /// on the capture deadline instead.
    Done,
    /// The owning session went away; the capture is abandoned.
    Cancelled,
}

/// Registry mapping in-flight invocations to their capture channels.
///
/// The dispatcher's output-emission path looks an invocation up by id
/// and pushes; the engine owns the receive side and the deadline timer.
#[derive(Default)]
pub struct CaptureRouter {
    windows: Mutex<HashMap<InvocationId, mpsc::UnboundedSender<OutputEvent>>>,
}

impl CaptureRouter {
    fn open(&self, invocation: InvocationId) -> mpsc::UnboundedReceiver<OutputEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().insert(invocation, tx);
        rx
    }

    fn close(&self, invocation: InvocationId) {
        self.lock().remove(&invocation);
    }

    /// Pushes one output chunk into the invocation's capture window.
    /// Returns false when no window is open for the id.
    pub fn push_chunk(&self, invocation: InvocationId, text: &str) -> bool {
        self.send(invocation, OutputEvent::Chunk(text.to_string()))
    }

    /// Signals that the invocation will produce no further output.
    pub fn finish(&self, invocation: InvocationId) -> bool {
        self.send(invocation, OutputEvent::Done)
    }

    /// Abandons the invocation's capture, e.g. on session disconnect.
    pub fn cancel(&self, invocation: InvocationId) -> bool {
        self.send(invocation, OutputEvent::Cancelled)
    }

    pub fn is_open(&self, invocation: InvocationId) -> bool {
        self.lock().contains_key(&invocation)
    }

    fn send(&self, invocation: InvocationId, event: OutputEvent) -> bool {
        match self.lock().get(&invocation) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<InvocationId, mpsc::UnboundedSender<OutputEvent>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The window closed after output, or on an explicit done signal.
    Completed,
    /// The deadline elapsed with zero chunks captured.
    TimedOut,
}

/// What the function-call handler hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionReply {
    /// Minimal acknowledgement carrying no captured content, so the
    /// caller does not re-narrate output that was already forwarded.
    Acknowledgement(String),
    /// Captured chunks joined in arrival order.
    Text(String),
    /// The window closed with zero chunks; a reported empty state, not
    /// an error.
    NoOutput(String),
}

impl FunctionReply {
    pub fn text(&self) -> &str {
        match self {
            Self::Acknowledgement(text) | Self::Text(text) | Self::NoOutput(text) => text,
        }
    }

    pub fn is_no_output(&self) -> bool {
        matches!(self, Self::NoOutput(_))
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub invocation: InvocationId,
    pub command_line: String,
    pub chunks: Vec<String>,
    pub outcome: CaptureOutcome,
    pub reply: FunctionReply,
}

/// Submits synthesized commands to the host dispatcher and captures
/// their asynchronous output.
///
/// Each invocation owns an independent capture window with a fixed
/// absolute deadline of `capture_timeout_sec` from submission time (the
/// deadline is not renewed by activity, so slow, chunky commands are cut
/// off at the same instant regardless of pacing). Concurrent
/// invocations never share state; forwarding pacing applies only
/// between chunks of the same invocation.
pub struct ExecutionCaptureEngine {
    config: Arc<ConfigHandle>,
    dispatcher: Arc<dyn CommandDispatcher>,
    conversation: Arc<dyn ConversationSink>,
    router: Arc<CaptureRouter>,
    next_invocation: AtomicU64,
    shutdown: watch::Sender<bool>,
}

impl ExecutionCaptureEngine {
    pub fn new(
        config: Arc<ConfigHandle>,
        dispatcher: Arc<dyn CommandDispatcher>,
        conversation: Arc<dyn ConversationSink>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            dispatcher,
            conversation,
            router: Arc::new(CaptureRouter::default()),
            next_invocation: AtomicU64::new(1),
            shutdown,
        }
    }

    /// The registry the host's output-emission path pushes into.
    pub fn router(&self) -> Arc<CaptureRouter> {
        Arc::clone(&self.router)
    }

    /// Abandons every in-flight capture; waiters observe `Cancelled`.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    pub async fn execute(
        &self,
        binding: &Binding,
        raw_args: &str,
        session: &SessionContext,
    ) -> Result<ExecutionReport> {
        if *self.shutdown.borrow() {
            return Err(CommandBridgeError::Cancelled("engine is shutting down".to_string()));
        }

        // Live values, re-read per call so hot reloads take effect.
        let execution = self.config.snapshot().execution;
        let command_line = build_command_line(binding, raw_args, &session.wake_prefix)?;
        let invocation = InvocationId(self.next_invocation.fetch_add(1, Ordering::Relaxed));

        // Open the window before submitting so synchronously emitted
        // chunks are never lost.
        let mut rx = self.router.open(invocation);
        let submission = CommandSubmission {
            invocation,
            session_id: session.session_id.clone(),
            command_line: command_line.clone(),
            sender_id: session.sender_id.clone(),
            sender_name: session.sender_name.clone(),
        };
        if let Err(err) = self.dispatcher.submit(submission).await {
            self.router.close(invocation);
            tracing::warn!(%invocation, command = %command_line, error = %err, "dispatch rejected");
            return Err(err);
        }
        tracing::info!(%invocation, command = %command_line, "command submitted");

        let deadline = Instant::now() + execution.capture_timeout();
        let mut shutdown = self.shutdown.subscribe();
        let mut chunks: Vec<String> = Vec::new();
        let mut explicit_done = false;

        let capture: Result<()> = loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(OutputEvent::Chunk(text)) => chunks.push(text),
                    Some(OutputEvent::Done) => {
                        explicit_done = true;
                        break Ok(());
                    }
                    Some(OutputEvent::Cancelled) => {
                        break Err(CommandBridgeError::Cancelled(command_line.clone()));
                    }
                    None => break Ok(()),
                },
                _ = tokio::time::sleep_until(deadline) => break Ok(()),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break Err(CommandBridgeError::Cancelled(command_line.clone()));
                    }
                }
            }
        };
        self.router.close(invocation);
        // Abandoned windows forward nothing and deliver nothing.
        capture?;

        let outcome = if chunks.is_empty() && !explicit_done {
            CaptureOutcome::TimedOut
        } else {
            CaptureOutcome::Completed
        };
        tracing::info!(%invocation, chunks = chunks.len(), ?outcome, "capture window closed");

        if execution.response_mode.forwards() && !chunks.is_empty() {
            let interval = execution.forward_interval();
            for (index, chunk) in chunks.iter().enumerate() {
                if index > 0 && !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
                self.conversation.send_text(&session.session_id, chunk).await?;
            }
        }

        let reply = shape_reply(&execution.response_mode, binding, &chunks);
        Ok(ExecutionReport {
            invocation,
            command_line,
            chunks,
            outcome,
            reply,
        })
    }
}

fn shape_reply(mode: &ResponseMode, binding: &Binding, chunks: &[String]) -> FunctionReply {
    let command_text = binding.command_name.command_text();
    if chunks.is_empty() {
        return FunctionReply::NoOutput(format!(
            "Command '{command_text}' produced no output before the capture window closed."
        ));
    }
    match mode {
        ResponseMode::ForwardOnly => FunctionReply::Acknowledgement(format!(
            "Command '{command_text}' executed; output was forwarded to the conversation."
        )),
        ResponseMode::ForwardAndText | ResponseMode::TextOnly => {
            FunctionReply::Text(chunks.join("\n"))
        }
    }
}
