use crate::bindings::Binding;
use crate::error::{CommandBridgeError, Result};

/// Builds the exact command line to submit to the host dispatcher.
///
/// The binding's segments are space-joined, the session wake prefix is
/// prepended only when the text does not already start with it (a literal
/// prefix test, so synthesis is idempotent), and the raw arguments are
/// appended verbatim after a single space unless fully empty. Argument
/// content is never inspected or escaped.
pub fn build_command_line(binding: &Binding, raw_args: &str, wake_prefix: &str) -> Result<String> {
    if wake_prefix.is_empty() {
        return Err(CommandBridgeError::MissingContext(
            "session wake prefix".to_string(),
        ));
    }

    let base = binding.command_name.command_text();
    let mut command_line = if base.starts_with(wake_prefix) {
        base
    } else {
        format!("{wake_prefix}{base}")
    };

    if !raw_args.is_empty() {
        command_line.push(' ');
        command_line.push_str(raw_args);
    }

    Ok(command_line)
}
