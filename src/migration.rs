use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::bindings::{Binding, BindingStore, CommandName};
use crate::error::{CommandBridgeError, Result};

#[derive(Debug, Clone)]
pub struct MigrationFailure {
    pub entry: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct MigrationReport {
    /// True when migration was not attempted (already done, switched
    /// off, store already populated, or no legacy file present).
    pub skipped: bool,
    pub migrated: usize,
    pub failures: Vec<MigrationFailure>,
    pub backup_path: Option<PathBuf>,
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skipped {
            return write!(f, "legacy migration skipped");
        }
        write!(
            f,
            "legacy migration: migrated={} failures={}",
            self.migrated,
            self.failures.len()
        )
    }
}

/// One-shot transform of the legacy flat mapping file into the binding
/// store, guarded by the persisted `migration_done` flag.
///
/// Per-entry failures are collected into the report and never abort the
/// rest; only a store-level error (configuration persistence) aborts and
/// leaves the flag unset.
pub fn migrate_if_needed(store: &BindingStore, legacy_path: &Path) -> Result<MigrationReport> {
    let config = store.config().snapshot();
    if !config.compat.auto_migrate_legacy || config.compat.migration_done {
        return Ok(MigrationReport {
            skipped: true,
            ..MigrationReport::default()
        });
    }

    // A populated store means the configuration document is already the
    // source of truth; nothing to carry over.
    if !config.mappings.bindings.is_empty() || !legacy_path.exists() {
        mark_done(store)?;
        return Ok(MigrationReport {
            skipped: true,
            ..MigrationReport::default()
        });
    }

    let mut report = MigrationReport::default();

    match read_legacy_entries(legacy_path) {
        Ok(entries) => {
            for (command, value) in entries {
                match binding_from_legacy(&command, &value) {
                    Ok(binding) => match store.add(binding) {
                        Ok(()) => report.migrated += 1,
                        Err(err @ CommandBridgeError::Config(_)) => return Err(err),
                        Err(err) => report.failures.push(MigrationFailure {
                            entry: command,
                            reason: err.to_string(),
                        }),
                    },
                    Err(err) => report.failures.push(MigrationFailure {
                        entry: command,
                        reason: err.to_string(),
                    }),
                }
            }
        }
        Err(reason) => report.failures.push(MigrationFailure {
            entry: legacy_path.display().to_string(),
            reason,
        }),
    }

    if config.compat.keep_legacy_backup && legacy_path.exists() {
        let mut backup = legacy_path.as_os_str().to_os_string();
        backup.push(".bak");
        let backup = PathBuf::from(backup);
        match std::fs::copy(legacy_path, &backup) {
            Ok(_) => {
                tracing::info!(backup = %backup.display(), "legacy mapping file backed up");
                report.backup_path = Some(backup);
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not back up legacy mapping file");
            }
        }
    }

    mark_done(store)?;
    tracing::info!(migrated = report.migrated, failures = report.failures.len(), "legacy migration finished");
    Ok(report)
}

fn mark_done(store: &BindingStore) -> Result<()> {
    store.config().update(|draft| {
        draft.compat.migration_done = true;
        Ok(())
    })
}

fn read_legacy_entries(path: &Path) -> std::result::Result<Vec<(String, Value)>, String> {
    let raw = std::fs::read_to_string(path).map_err(|err| err.to_string())?;
    let value: Value = serde_json::from_str(&raw).map_err(|err| err.to_string())?;
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Err("legacy mapping file is not a JSON object".to_string()),
    }
}

fn binding_from_legacy(command: &str, value: &Value) -> Result<Binding> {
    let map = value
        .as_object()
        .ok_or_else(|| CommandBridgeError::InvalidCommandName(format!("'{command}': entry is not an object")))?;
    let function = map
        .get("llm_function")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| {
            CommandBridgeError::InvalidFunctionName(format!("'{command}': missing llm_function"))
        })?;

    // Legacy keys store the command with spaces between segments.
    let segments = command
        .split_whitespace()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let command_name = CommandName::new(segments)?;

    let mut binding = Binding::new(command_name, function);
    if let Some(description) = map.get("description").and_then(|v| v.as_str()) {
        binding.description = description.trim().to_string();
    }
    Ok(binding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_entry_becomes_enabled_binding() {
        let value = json!({"llm_function": "list_reminders", "description": " Lists reminders "});
        let binding = binding_from_legacy("rmd ls", &value).unwrap();
        assert_eq!(binding.command_name.storage_key(), "rmd--ls");
        assert_eq!(binding.function_name, "list_reminders");
        assert_eq!(binding.description, "Lists reminders");
        assert!(binding.enabled);
        assert_eq!(binding.group, "");
        assert!(binding.aliases.is_empty());
    }

    #[test]
    fn malformed_entries_are_rejected() {
        assert!(binding_from_legacy("rmd ls", &json!("nope")).is_err());
        assert!(binding_from_legacy("rmd ls", &json!({"description": "x"})).is_err());
        assert!(binding_from_legacy("  ", &json!({"llm_function": "f"})).is_err());
    }
}
