use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::config::ConfigHandle;
use crate::error::{CommandBridgeError, Result};

/// Structural separator for the storage/lookup form of a command name.
/// It never reaches the dispatcher; `command_text` always space-joins.
pub const SEPARATOR: &str = "--";

static FUNCTION_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid pattern"));

/// Ordered path segments of a command, e.g. `["rmd", "ls"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandName {
    segments: Vec<String>,
}

impl CommandName {
    pub fn new(segments: Vec<String>) -> Result<Self> {
        if segments.is_empty() {
            return Err(CommandBridgeError::InvalidCommandName(
                "command name is empty".to_string(),
            ));
        }
        if segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(CommandBridgeError::InvalidCommandName(
                "command name contains an empty segment".to_string(),
            ));
        }
        Ok(Self { segments })
    }

    /// Parses the storage form, e.g. `rmd--ls`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CommandBridgeError::InvalidCommandName(
                "command name is empty".to_string(),
            ));
        }
        let segments = trimmed
            .split(SEPARATOR)
            .map(|segment| segment.to_string())
            .collect::<Vec<_>>();
        Self::new(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Canonical storage/lookup key, segments joined with `--`.
    pub fn storage_key(&self) -> String {
        self.segments.join(SEPARATOR)
    }

    /// Dispatcher-facing text, segments joined with a single space.
    pub fn command_text(&self) -> String {
        self.segments.join(" ")
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

impl Serialize for CommandName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.storage_key())
    }
}

impl<'de> Deserialize<'de> for CommandName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(de::Error::custom)
    }
}

fn default_enabled() -> bool {
    true
}

/// One mapping from a structured command name to a callable function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub command_name: CommandName,
    pub function_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg_description: Option<String>,
    #[serde(default)]
    pub group: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Reserved alternate names. No lookup effect; round-trips unchanged.
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Binding {
    pub fn new(command_name: CommandName, function_name: &str) -> Self {
        Self {
            command_name,
            function_name: function_name.to_string(),
            description: String::new(),
            arg_description: None,
            group: String::new(),
            enabled: true,
            aliases: Vec::new(),
            created_at: Some(Utc::now()),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFilter {
    All,
    Enabled,
    Disabled,
}

impl ListFilter {
    fn matches(&self, binding: &Binding) -> bool {
        match self {
            Self::All => true,
            Self::Enabled => binding.enabled,
            Self::Disabled => !binding.enabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    Changed,
    Unchanged,
}

/// The binding table, read from and written back to the injected
/// configuration document on every operation. Mutations are atomic: the
/// new table is persisted before it is published, and any failure leaves
/// the table as it was.
pub struct BindingStore {
    config: Arc<ConfigHandle>,
}

impl BindingStore {
    pub fn new(config: Arc<ConfigHandle>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Arc<ConfigHandle> {
        &self.config
    }

    pub fn add(&self, binding: Binding) -> Result<()> {
        let key = binding.command_name.storage_key();
        self.config.update(|draft| {
            if binding.function_name.trim().is_empty() {
                return Err(CommandBridgeError::InvalidFunctionName(
                    "function name is empty".to_string(),
                ));
            }
            if draft.basic.strict_validation
                && !FUNCTION_NAME_PATTERN.is_match(&binding.function_name)
            {
                return Err(CommandBridgeError::InvalidFunctionName(
                    binding.function_name.clone(),
                ));
            }
            if draft
                .mappings
                .bindings
                .iter()
                .any(|existing| existing.command_name == binding.command_name)
            {
                return Err(CommandBridgeError::DuplicateCommand(key.clone()));
            }
            if !draft.mappings.allow_duplicate_function {
                if let Some(existing) = draft
                    .mappings
                    .bindings
                    .iter()
                    .find(|existing| existing.function_name == binding.function_name)
                {
                    return Err(CommandBridgeError::DuplicateFunction(format!(
                        "'{}' is already used by '{}'",
                        binding.function_name,
                        existing.command_name.storage_key()
                    )));
                }
            }
            draft.mappings.bindings.push(binding.clone());
            Ok(())
        })?;
        tracing::debug!(command = %key, "binding added");
        Ok(())
    }

    pub fn remove(&self, command_name: &CommandName) -> Result<()> {
        let key = command_name.storage_key();
        self.config.update(|draft| {
            let before = draft.mappings.bindings.len();
            draft
                .mappings
                .bindings
                .retain(|binding| binding.command_name != *command_name);
            if draft.mappings.bindings.len() == before {
                return Err(CommandBridgeError::NotFound(key.clone()));
            }
            Ok(())
        })?;
        tracing::debug!(command = %key, "binding removed");
        Ok(())
    }

    pub fn get(&self, command_name: &CommandName) -> Result<Binding> {
        self.config
            .snapshot()
            .mappings
            .bindings
            .into_iter()
            .find(|binding| binding.command_name == *command_name)
            .ok_or_else(|| CommandBridgeError::NotFound(command_name.storage_key()))
    }

    /// Bindings in insertion order, filtered by enabled state.
    pub fn list(&self, filter: ListFilter) -> Vec<Binding> {
        self.config
            .snapshot()
            .mappings
            .bindings
            .into_iter()
            .filter(|binding| filter.matches(binding))
            .collect()
    }

    pub fn set_enabled(&self, command_name: &CommandName, enabled: bool) -> Result<EnableOutcome> {
        let current = self.get(command_name)?;
        if current.enabled == enabled {
            return Ok(EnableOutcome::Unchanged);
        }
        let key = command_name.storage_key();
        self.config.update(|draft| {
            let binding = draft
                .mappings
                .bindings
                .iter_mut()
                .find(|binding| binding.command_name == *command_name)
                .ok_or_else(|| CommandBridgeError::NotFound(key.clone()))?;
            if binding.enabled == enabled {
                return Ok(EnableOutcome::Unchanged);
            }
            binding.enabled = enabled;
            Ok(EnableOutcome::Changed)
        })
    }
}
