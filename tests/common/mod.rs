#![allow(dead_code)]

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use command_bridge::bridge::CommandBridge;
use command_bridge::capture::CaptureRouter;
use command_bridge::config::{BridgeConfig, ConfigHandle};
use command_bridge::error::CommandBridgeError;
use command_bridge::interfaces::dispatcher::{
    CommandDispatcher, CommandSubmission, ConversationSink, SessionContext,
};
use command_bridge::interfaces::functions::{FunctionDecl, FunctionHost};
use command_bridge::Result;

/// One scripted response for a single submission, consumed in order.
#[derive(Clone, Default)]
pub struct ScriptedOutput {
    /// (delay before emitting, chunk text)
    pub chunks: Vec<(Duration, String)>,
    /// Send the explicit no-more-output signal after the chunks.
    pub finish: bool,
    /// Abandon the invocation after the chunks instead of finishing.
    pub cancel: bool,
    /// Emit the submitted command line back as a single chunk.
    pub echo_command: bool,
    /// Reject the submission outright.
    pub fail_submit: bool,
}

impl ScriptedOutput {
    pub fn chunks_then_finish(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks
                .iter()
                .map(|text| (Duration::ZERO, text.to_string()))
                .collect(),
            finish: true,
            ..Self::default()
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn echo() -> Self {
        Self {
            echo_command: true,
            finish: true,
            ..Self::default()
        }
    }

    pub fn rejecting() -> Self {
        Self {
            fail_submit: true,
            ..Self::default()
        }
    }
}

/// Test double for the host command processor: plays back scripted
/// output through the capture router, keyed by invocation id.
#[derive(Default)]
pub struct ScriptedDispatcher {
    router: OnceLock<Arc<CaptureRouter>>,
    script: Mutex<Vec<ScriptedOutput>>,
    submissions: Mutex<Vec<CommandSubmission>>,
}

impl ScriptedDispatcher {
    pub fn attach(&self, router: Arc<CaptureRouter>) {
        let _ = self.router.set(router);
    }

    pub fn push_script(&self, output: ScriptedOutput) {
        self.script.lock().unwrap().push(output);
    }

    pub fn submissions(&self) -> Vec<CommandSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn submitted_lines(&self) -> Vec<String> {
        self.submissions()
            .iter()
            .map(|submission| submission.command_line.clone())
            .collect()
    }
}

#[async_trait]
impl CommandDispatcher for ScriptedDispatcher {
    async fn submit(&self, submission: CommandSubmission) -> Result<()> {
        let output = {
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                ScriptedOutput::silent()
            } else {
                script.remove(0)
            }
        };
        if output.fail_submit {
            return Err(CommandBridgeError::DispatchUnavailable(
                "host rejected the submission".to_string(),
            ));
        }
        self.submissions.lock().unwrap().push(submission.clone());

        let router = self.router.get().cloned().expect("router attached");
        tokio::spawn(async move {
            let invocation = submission.invocation;
            if output.echo_command {
                router.push_chunk(invocation, &submission.command_line);
            }
            for (delay, text) in output.chunks {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                router.push_chunk(invocation, &text);
            }
            if output.cancel {
                router.cancel(invocation);
            } else if output.finish {
                router.finish(invocation);
            }
        });
        Ok(())
    }
}

/// Records forwarded conversation messages with their send instants.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(Instant, String, String)>>,
}

impl RecordingSink {
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, text)| text.clone())
            .collect()
    }

    pub fn instants(&self) -> Vec<Instant> {
        self.sent.lock().unwrap().iter().map(|(at, _, _)| *at).collect()
    }

    pub fn sessions(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, session, _)| session.clone())
            .collect()
    }
}

#[async_trait]
impl ConversationSink for RecordingSink {
    async fn send_text(&self, session_id: &str, text: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((Instant::now(), session_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// Records every declared function set, in sync order.
#[derive(Default)]
pub struct RecordingHost {
    sets: Mutex<Vec<Vec<FunctionDecl>>>,
}

impl RecordingHost {
    pub fn sync_count(&self) -> usize {
        self.sets.lock().unwrap().len()
    }

    pub fn last_set(&self) -> Vec<FunctionDecl> {
        self.sets.lock().unwrap().last().cloned().unwrap_or_default()
    }

    pub fn all_sets(&self) -> Vec<Vec<FunctionDecl>> {
        self.sets.lock().unwrap().clone()
    }
}

#[async_trait]
impl FunctionHost for RecordingHost {
    async fn replace_functions(&self, functions: Vec<FunctionDecl>) -> Result<()> {
        self.sets.lock().unwrap().push(functions);
        Ok(())
    }
}

pub struct Harness {
    pub bridge: Arc<CommandBridge>,
    pub dispatcher: Arc<ScriptedDispatcher>,
    pub sink: Arc<RecordingSink>,
    pub host: Arc<RecordingHost>,
    pub config: Arc<ConfigHandle>,
}

pub fn harness(config: BridgeConfig) -> Harness {
    let config = Arc::new(ConfigHandle::new(config));
    let dispatcher = Arc::new(ScriptedDispatcher::default());
    let sink = Arc::new(RecordingSink::default());
    let host = Arc::new(RecordingHost::default());
    let bridge = Arc::new(CommandBridge::new(
        Arc::clone(&config),
        dispatcher.clone(),
        sink.clone(),
        host.clone(),
    ));
    dispatcher.attach(bridge.engine().router());
    Harness {
        bridge,
        dispatcher,
        sink,
        host,
        config,
    }
}

pub fn session() -> SessionContext {
    SessionContext::new("sess-1", "/", "tester")
}
