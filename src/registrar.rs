use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::bindings::{Binding, BindingStore, ListFilter};
use crate::config::ToolConfig;
use crate::error::Result;
use crate::interfaces::functions::{FunctionDecl, FunctionHost};

#[derive(Default)]
struct Published {
    decls: Vec<FunctionDecl>,
    by_name: HashMap<String, usize>,
}

/// Declares one callable per enabled binding to the host function-call
/// system and keeps the caller-visible set consistent with the store.
///
/// `sync` builds the complete new declaration set first and swaps it in
/// as a unit, so readers never observe an empty or half-built surface
/// mid-refresh. Duplicate function names (when the store allows them)
/// are all declared; name resolution is last-wins.
pub struct FunctionRegistrar {
    store: Arc<BindingStore>,
    host: Arc<dyn FunctionHost>,
    published: RwLock<Arc<Published>>,
    sync_lock: Mutex<()>,
}

impl FunctionRegistrar {
    pub fn new(store: Arc<BindingStore>, host: Arc<dyn FunctionHost>) -> Self {
        Self {
            store,
            host,
            published: RwLock::new(Arc::new(Published::default())),
            sync_lock: Mutex::new(()),
        }
    }

    /// Re-declares the callable set from the current enabled bindings.
    /// Returns the number of declared functions.
    pub async fn sync(&self) -> Result<usize> {
        let _guard = self.sync_lock.lock().await;

        let config = self.store.config().snapshot();
        let decls = if config.basic.enable_plugin {
            self.store
                .list(ListFilter::Enabled)
                .iter()
                .map(|binding| declaration_for(binding, &config.tool))
                .collect::<Vec<_>>()
        } else {
            tracing::info!("bridge disabled, declaring no functions");
            Vec::new()
        };

        let mut by_name = HashMap::new();
        for (index, decl) in decls.iter().enumerate() {
            by_name.insert(decl.name.clone(), index);
        }

        let count = decls.len();
        self.host.replace_functions(decls.clone()).await?;

        let mut guard = self.published.write().await;
        *guard = Arc::new(Published { decls, by_name });
        drop(guard);

        tracing::debug!(functions = count, "function declarations synced");
        Ok(count)
    }

    /// Resolves a caller-visible function name to its declaration
    /// (last-wins for duplicate names).
    pub async fn resolve(&self, function_name: &str) -> Option<FunctionDecl> {
        let published = self.published.read().await.clone();
        published
            .by_name
            .get(function_name)
            .map(|index| published.decls[*index].clone())
    }

    pub async fn declared(&self) -> Vec<FunctionDecl> {
        self.published.read().await.decls.clone()
    }
}

fn declaration_for(binding: &Binding, tool: &ToolConfig) -> FunctionDecl {
    let mut description = format!("Runs the command '{}'", binding.command_name.command_text());
    if !binding.description.trim().is_empty() {
        description.push_str(": ");
        description.push_str(binding.description.trim());
    }
    if !tool.description.trim().is_empty() {
        description.push_str(". ");
        description.push_str(tool.description.trim());
    }

    let arg_description = binding
        .arg_description
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| tool.arg_description.trim())
        .to_string();

    FunctionDecl {
        name: binding.function_name.clone(),
        description,
        arg_description,
        command_name: binding.command_name.clone(),
    }
}
