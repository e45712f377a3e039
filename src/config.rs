use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bindings::Binding;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub enable_plugin: bool,
    pub auto_refresh_on_change: bool,
    pub strict_validation: bool,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            enable_plugin: true,
            auto_refresh_on_change: true,
            strict_validation: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub bindings: Vec<Binding>,
    pub allow_duplicate_function: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
            allow_duplicate_function: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    ForwardOnly,
    ForwardAndText,
    TextOnly,
}

impl Default for ResponseMode {
    fn default() -> Self {
        Self::ForwardOnly
    }
}

impl ResponseMode {
    pub fn forwards(&self) -> bool {
        matches!(self, Self::ForwardOnly | Self::ForwardAndText)
    }

    pub fn returns_text(&self) -> bool {
        matches!(self, Self::ForwardAndText | Self::TextOnly)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub capture_timeout_sec: f64,
    pub forward_interval_sec: f64,
    pub response_mode: ResponseMode,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            capture_timeout_sec: 20.0,
            forward_interval_sec: 0.5,
            response_mode: ResponseMode::default(),
        }
    }
}

impl ExecutionConfig {
    /// Capture window length, clamped to at least one second.
    pub fn capture_timeout(&self) -> Duration {
        let secs = if self.capture_timeout_sec.is_finite() {
            self.capture_timeout_sec.max(1.0)
        } else {
            20.0
        };
        Duration::from_secs_f64(secs)
    }

    /// Pause between forwarded chunks of a single invocation.
    pub fn forward_interval(&self) -> Duration {
        let secs = if self.forward_interval_sec.is_finite() {
            self.forward_interval_sec.max(0.0)
        } else {
            0.5
        };
        Duration::from_secs_f64(secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Appended to every generated function description.
    pub description: String,
    /// Fallback argument documentation for bindings without their own.
    pub arg_description: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            description: "Maps existing bot commands to callable functions so the agent can trigger them.".to_string(),
            arg_description: "Argument string for the command. Prefer key=value pairs separated by spaces, e.g. text=water time=10:00.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatConfig {
    pub auto_migrate_legacy: bool,
    pub keep_legacy_backup: bool,
    pub migration_done: bool,
}

impl Default for CompatConfig {
    fn default() -> Self {
        Self {
            auto_migrate_legacy: true,
            keep_legacy_backup: true,
            migration_done: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub basic: BasicConfig,
    pub mappings: MappingConfig,
    pub execution: ExecutionConfig,
    pub tool: ToolConfig,
    pub compat: CompatConfig,
}

/// Write-back hook for the owner of the configuration document.
pub trait ConfigSink: Send + Sync {
    fn persist(&self, config: &BridgeConfig) -> Result<()>;
}

/// Shared handle to the injected configuration document.
///
/// The document is the single source of truth for the binding table and
/// all execution knobs; callers take a fresh `snapshot` per operation so
/// hot reloads via `replace` are picked up without restarts. Mutations go
/// through `update`, which edits a draft, persists it through the sink,
/// and only then publishes; a failing mutation or persist leaves the
/// published document untouched.
pub struct ConfigHandle {
    inner: RwLock<BridgeConfig>,
    sink: Option<Arc<dyn ConfigSink>>,
}

impl ConfigHandle {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            inner: RwLock::new(config),
            sink: None,
        }
    }

    pub fn with_sink(config: BridgeConfig, sink: Arc<dyn ConfigSink>) -> Self {
        Self {
            inner: RwLock::new(config),
            sink: Some(sink),
        }
    }

    pub fn snapshot(&self) -> BridgeConfig {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Hot-reload entry point: swap in an externally edited document.
    pub fn replace(&self, config: BridgeConfig) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = config;
    }

    pub fn update<T>(&self, mutate: impl FnOnce(&mut BridgeConfig) -> Result<T>) -> Result<T> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut draft = guard.clone();
        let out = mutate(&mut draft)?;
        if let Some(sink) = &self.sink {
            sink.persist(&draft)?;
        }
        *guard = draft;
        Ok(out)
    }
}
