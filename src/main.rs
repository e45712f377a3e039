use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use clap::Parser;
use tokio::io::AsyncBufReadExt;

use command_bridge::admin::AdminSurface;
use command_bridge::bridge::CommandBridge;
use command_bridge::capture::CaptureRouter;
use command_bridge::config::{BridgeConfig, ConfigHandle};
use command_bridge::error::CommandBridgeError;
use command_bridge::interfaces::dispatcher::{
    CommandDispatcher, CommandSubmission, ConversationSink, SessionContext,
};
use command_bridge::interfaces::functions::{FunctionDecl, FunctionHost};
use command_bridge::Result;

#[derive(Parser, Debug)]
#[command(name = "command-bridge")]
#[command(about = "Interactive harness for the command-to-function bridge")]
struct Cli {
    #[arg(long, default_value = "/")]
    wake_prefix: String,

    #[arg(long, default_value = "repl")]
    session_id: String,

    #[arg(long)]
    legacy_file: Option<PathBuf>,
}

/// Toy stand-in for the host command processor: understands `echo` and
/// `stamp`, emits chunks back through the capture router.
#[derive(Default)]
struct LoopbackDispatcher {
    router: OnceLock<Arc<CaptureRouter>>,
}

impl LoopbackDispatcher {
    fn attach(&self, router: Arc<CaptureRouter>) {
        let _ = self.router.set(router);
    }
}

#[async_trait]
impl CommandDispatcher for LoopbackDispatcher {
    async fn submit(&self, submission: CommandSubmission) -> Result<()> {
        let router = self
            .router
            .get()
            .cloned()
            .ok_or_else(|| CommandBridgeError::DispatchUnavailable("no router attached".to_string()))?;

        tokio::spawn(async move {
            let invocation = submission.invocation;
            let body = submission.command_line.trim_start_matches('/');
            if let Some(args) = body.strip_prefix("echo") {
                router.push_chunk(invocation, args.trim());
            } else if body.starts_with("stamp") {
                let now = chrono::Utc::now();
                router.push_chunk(invocation, &now.format("%Y-%m-%d").to_string());
                router.push_chunk(invocation, &now.format("%H:%M:%S UTC").to_string());
            } else {
                router.push_chunk(
                    invocation,
                    &format!("unknown command: {}", submission.command_line),
                );
            }
            router.finish(invocation);
        });
        Ok(())
    }
}

struct StdoutSink;

#[async_trait]
impl ConversationSink for StdoutSink {
    async fn send_text(&self, session_id: &str, text: &str) -> Result<()> {
        println!("[{session_id}] {text}");
        Ok(())
    }
}

struct LoggingHost;

#[async_trait]
impl FunctionHost for LoggingHost {
    async fn replace_functions(&self, functions: Vec<FunctionDecl>) -> Result<()> {
        for decl in &functions {
            tracing::info!(name = %decl.name, command = %decl.command_name, "declared function");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    command_bridge::logging::init_tracing("command_bridge");
    let cli = Cli::parse();

    let config = Arc::new(ConfigHandle::new(BridgeConfig::default()));
    let dispatcher = Arc::new(LoopbackDispatcher::default());
    let bridge = Arc::new(CommandBridge::new(
        config,
        dispatcher.clone(),
        Arc::new(StdoutSink),
        Arc::new(LoggingHost),
    ));
    dispatcher.attach(bridge.engine().router());

    let report = bridge.startup(cli.legacy_file.as_deref()).await?;
    if !report.skipped {
        println!("{report}");
    }

    let session = SessionContext::new(&cli.session_id, &cli.wake_prefix, "user");
    let admin = AdminSurface::new(Arc::clone(&bridge));

    println!("command-bridge REPL. Try: add echo say_hello Echoes text back");
    println!("Then: exec echo hello world  (or 'help'; 'quit' to leave)");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        let reply = admin.dispatch(&session, line).await;
        println!("{reply}");
    }

    bridge.engine().shutdown();
    Ok(())
}
