use std::path::Path;
use std::sync::Arc;

use crate::bindings::{Binding, BindingStore, CommandName, EnableOutcome, ListFilter};
use crate::capture::{ExecutionCaptureEngine, ExecutionReport, FunctionReply};
use crate::config::{BridgeConfig, ConfigHandle};
use crate::error::{CommandBridgeError, Result};
use crate::interfaces::dispatcher::{CommandDispatcher, ConversationSink, SessionContext};
use crate::interfaces::functions::FunctionHost;
use crate::migration::{migrate_if_needed, MigrationReport};
use crate::registrar::FunctionRegistrar;

/// Wires the binding store, function registrar and capture engine
/// together behind the two call surfaces: administrative commands and
/// the function-call boundary.
pub struct CommandBridge {
    config: Arc<ConfigHandle>,
    store: Arc<BindingStore>,
    registrar: Arc<FunctionRegistrar>,
    engine: Arc<ExecutionCaptureEngine>,
}

impl CommandBridge {
    pub fn new(
        config: Arc<ConfigHandle>,
        dispatcher: Arc<dyn CommandDispatcher>,
        conversation: Arc<dyn ConversationSink>,
        host: Arc<dyn FunctionHost>,
    ) -> Self {
        let store = Arc::new(BindingStore::new(Arc::clone(&config)));
        let registrar = Arc::new(FunctionRegistrar::new(Arc::clone(&store), host));
        let engine = Arc::new(ExecutionCaptureEngine::new(
            Arc::clone(&config),
            dispatcher,
            conversation,
        ));
        Self {
            config,
            store,
            registrar,
            engine,
        }
    }

    pub fn config(&self) -> &Arc<ConfigHandle> {
        &self.config
    }

    pub fn store(&self) -> &Arc<BindingStore> {
        &self.store
    }

    pub fn registrar(&self) -> &Arc<FunctionRegistrar> {
        &self.registrar
    }

    pub fn engine(&self) -> &Arc<ExecutionCaptureEngine> {
        &self.engine
    }

    /// Runs the one-shot legacy migration (when a legacy path is given)
    /// and declares the initial function set.
    pub async fn startup(&self, legacy_path: Option<&Path>) -> Result<MigrationReport> {
        let report = match legacy_path {
            Some(path) => migrate_if_needed(&self.store, path)?,
            None => MigrationReport {
                skipped: true,
                ..MigrationReport::default()
            },
        };
        let declared = self.registrar.sync().await?;
        tracing::info!(
            bindings = self.store.list(ListFilter::All).len(),
            enabled = self.store.list(ListFilter::Enabled).len(),
            functions = declared,
            "command bridge started"
        );
        Ok(report)
    }

    /// Hot-reload entry: swap in an externally edited configuration
    /// document and bring the declared functions back in line with it.
    pub async fn reload_config(&self, config: BridgeConfig) -> Result<()> {
        self.config.replace(config);
        self.refresh_after_mutation().await
    }

    pub async fn add_binding(&self, binding: Binding) -> Result<()> {
        self.ensure_enabled()?;
        self.store.add(binding)?;
        self.refresh_after_mutation().await
    }

    pub async fn remove_binding(&self, command_name: &CommandName) -> Result<()> {
        self.ensure_enabled()?;
        self.store.remove(command_name)?;
        self.refresh_after_mutation().await
    }

    pub async fn set_binding_enabled(
        &self,
        command_name: &CommandName,
        enabled: bool,
    ) -> Result<EnableOutcome> {
        self.ensure_enabled()?;
        let outcome = self.store.set_enabled(command_name, enabled)?;
        if outcome == EnableOutcome::Changed {
            self.refresh_after_mutation().await?;
        }
        Ok(outcome)
    }

    pub fn list_bindings(&self, filter: ListFilter) -> Vec<Binding> {
        self.store.list(filter)
    }

    /// Manual re-declaration of the callable set; returns the count.
    pub async fn refresh_functions(&self) -> Result<usize> {
        self.registrar.sync().await
    }

    /// The function-call boundary: a caller invoked `function_name` with
    /// opaque `args`. Resolves the declaration (last-wins for allowed
    /// duplicate names), executes the bound command and shapes the reply
    /// per the live response policy.
    pub async fn handle_function_call(
        &self,
        session: &SessionContext,
        function_name: &str,
        args: &str,
    ) -> Result<FunctionReply> {
        self.ensure_enabled()?;
        let decl = self
            .registrar
            .resolve(function_name)
            .await
            .ok_or_else(|| CommandBridgeError::NotFound(function_name.to_string()))?;
        let binding = self.lookup_enabled(&decl.command_name)?;
        let report = self.engine.execute(&binding, args, session).await?;
        Ok(report.reply)
    }

    /// Direct execution of a bound command, bypassing the function-call
    /// path (the administrative `exec` verb). Same contract as a
    /// caller-driven invocation.
    pub async fn execute_command(
        &self,
        session: &SessionContext,
        command_name: &CommandName,
        args: &str,
    ) -> Result<ExecutionReport> {
        self.ensure_enabled()?;
        let binding = self.lookup_enabled(command_name)?;
        self.engine.execute(&binding, args, session).await
    }

    fn lookup_enabled(&self, command_name: &CommandName) -> Result<Binding> {
        let binding = self.store.get(command_name)?;
        if !binding.enabled {
            return Err(CommandBridgeError::NotFound(command_name.storage_key()));
        }
        Ok(binding)
    }

    fn ensure_enabled(&self) -> Result<()> {
        if self.config.snapshot().basic.enable_plugin {
            Ok(())
        } else {
            Err(CommandBridgeError::Disabled)
        }
    }

    async fn refresh_after_mutation(&self) -> Result<()> {
        if self.config.snapshot().basic.auto_refresh_on_change {
            self.registrar.sync().await?;
        }
        Ok(())
    }
}
