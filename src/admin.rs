use std::sync::Arc;

use crate::bindings::{Binding, CommandName, EnableOutcome, ListFilter};
use crate::bridge::CommandBridge;
use crate::error::CommandBridgeError;
use crate::interfaces::dispatcher::SessionContext;

const HELP_TEXT: &str = "Command bridge subcommands:

add <command> <function> [description] - map a command to a callable function
ls [--enabled|--disabled|--all]        - list mappings, optionally filtered
rm <command>                           - remove a mapping
enable <command>                       - enable a mapping
disable <command>                      - disable a mapping
exec <command> [args]                  - run a mapped command directly
refresh                                - re-declare the callable functions
help                                   - show this help

Command names join segments with '--', e.g. rmd--ls for 'rmd ls'.
Example: add rmd--ls list_reminders Lists all reminders";

/// The administrative command surface. Each verb maps 1:1 to a binding
/// store, registrar or capture engine operation; results and errors are
/// rendered as short human-readable messages.
pub struct AdminSurface {
    bridge: Arc<CommandBridge>,
}

impl AdminSurface {
    pub fn new(bridge: Arc<CommandBridge>) -> Self {
        Self { bridge }
    }

    /// Handles one administrative line (the text after the group
    /// prefix, e.g. `add rmd--ls list_reminders`).
    pub async fn dispatch(&self, session: &SessionContext, input: &str) -> String {
        let (verb, rest) = next_token(input);
        match verb {
            "add" => self.add(rest).await,
            "ls" => self.list(rest),
            "rm" => self.remove(rest).await,
            "enable" => self.set_enabled(rest, true).await,
            "disable" => self.set_enabled(rest, false).await,
            "exec" => self.exec(session, rest).await,
            "refresh" => self.refresh().await,
            "" | "help" => HELP_TEXT.to_string(),
            other => format!("Unknown subcommand '{other}'. Try 'help'."),
        }
    }

    async fn add(&self, rest: &str) -> String {
        let (command_raw, rest) = next_token(rest);
        let (function_raw, description) = next_token(rest);
        if command_raw.is_empty() || function_raw.is_empty() {
            return "Usage: add <command> <function> [description]".to_string();
        }
        let command_name = match CommandName::parse(command_raw) {
            Ok(name) => name,
            Err(err) => return render_error(&err),
        };
        let key = command_name.storage_key();
        let binding = Binding::new(command_name, function_raw).with_description(description.trim());
        match self.bridge.add_binding(binding).await {
            Ok(()) => format!("Added mapping '{key}' -> '{function_raw}'."),
            Err(err) => render_error(&err),
        }
    }

    fn list(&self, rest: &str) -> String {
        let flag = rest.trim();
        let filter = match flag {
            "" | "--all" | "all" => ListFilter::All,
            "--enabled" | "enabled" => ListFilter::Enabled,
            "--disabled" | "disabled" => ListFilter::Disabled,
            _ => return "Invalid filter. Use --enabled, --disabled or --all.".to_string(),
        };

        let bindings = self.bridge.list_bindings(filter);
        if bindings.is_empty() {
            return match filter {
                ListFilter::All => "No mappings configured.".to_string(),
                ListFilter::Enabled => "No enabled mappings.".to_string(),
                ListFilter::Disabled => "No disabled mappings.".to_string(),
            };
        }

        let title = match filter {
            ListFilter::All => "Configured mappings:",
            ListFilter::Enabled => "Enabled mappings:",
            ListFilter::Disabled => "Disabled mappings:",
        };
        let mut out = String::from(title);
        for (index, binding) in bindings.iter().enumerate() {
            out.push_str(&format!(
                "\n{}. {} -> {}",
                index + 1,
                binding.command_name.storage_key(),
                binding.function_name
            ));
            if !binding.description.is_empty() {
                out.push_str(&format!(" ({})", binding.description));
            }
            if !binding.enabled {
                out.push_str(" [disabled]");
            }
        }
        out
    }

    async fn remove(&self, rest: &str) -> String {
        let (command_raw, _) = next_token(rest);
        if command_raw.is_empty() {
            return "Usage: rm <command>".to_string();
        }
        let command_name = match CommandName::parse(command_raw) {
            Ok(name) => name,
            Err(err) => return render_error(&err),
        };
        match self.bridge.remove_binding(&command_name).await {
            Ok(()) => format!("Removed mapping '{}'.", command_name.storage_key()),
            Err(err) => render_error(&err),
        }
    }

    async fn set_enabled(&self, rest: &str, enabled: bool) -> String {
        let verb = if enabled { "enable" } else { "disable" };
        let (command_raw, _) = next_token(rest);
        if command_raw.is_empty() {
            return format!("Usage: {verb} <command>");
        }
        let command_name = match CommandName::parse(command_raw) {
            Ok(name) => name,
            Err(err) => return render_error(&err),
        };
        match self.bridge.set_binding_enabled(&command_name, enabled).await {
            Ok(EnableOutcome::Changed) => format!(
                "{} mapping '{}'.",
                if enabled { "Enabled" } else { "Disabled" },
                command_name.storage_key()
            ),
            Ok(EnableOutcome::Unchanged) => format!(
                "Mapping '{}' is already {verb}d.",
                command_name.storage_key()
            ),
            Err(err) => render_error(&err),
        }
    }

    async fn exec(&self, session: &SessionContext, rest: &str) -> String {
        let (command_raw, args) = next_token(rest);
        if command_raw.is_empty() {
            return "Usage: exec <command> [args]".to_string();
        }
        let command_name = match CommandName::parse(command_raw) {
            Ok(name) => name,
            Err(err) => return render_error(&err),
        };
        match self.bridge.execute_command(session, &command_name, args).await {
            Ok(report) => report.reply.text().to_string(),
            Err(err) => render_error(&err),
        }
    }

    async fn refresh(&self) -> String {
        match self.bridge.refresh_functions().await {
            Ok(count) => format!("Refreshed; {count} function(s) declared."),
            Err(err) => render_error(&err),
        }
    }
}

fn render_error(err: &CommandBridgeError) -> String {
    match err {
        CommandBridgeError::Disabled => {
            "The bridge is disabled. Enable basic.enable_plugin in the configuration first."
                .to_string()
        }
        other => format!("Error: {other}"),
    }
}

/// Splits the next whitespace-delimited token off the input; the
/// remainder keeps its interior spacing.
fn next_token(input: &str) -> (&str, &str) {
    let trimmed = input.trim_start();
    match trimmed.find(char::is_whitespace) {
        Some(end) => (&trimmed[..end], trimmed[end..].trim_start()),
        None => (trimmed, ""),
    }
}
