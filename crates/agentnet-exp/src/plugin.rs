//! Plugin contracts and the registry resolving them by id.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use agentnet_core::errors::{ErrorInfo, SimError};
use agentnet_core::{Attributes, AttributesScope, Prg, Value};
use agentnet_graph::Graph;

/// Capability contract of an agent-update model plugin.
///
/// A fresh instance is created for every trial and bound to that trial's
/// graph during `setup`. The trial's generator is passed to every call that
/// may draw random numbers.
pub trait Model: Send {
    /// Stores the parameters and takes ownership of the trial's graph.
    fn setup(
        &mut self,
        prg: &mut Prg,
        params: &Attributes,
        graph: Box<dyn Graph>,
    ) -> Result<(), SimError>;

    /// Prepares the initial model state.
    fn init(&mut self, prg: &mut Prg) -> Result<(), SimError>;

    /// Runs one step of the update rule; returns true once the model converged.
    fn algorithm_step(&mut self, prg: &mut Prg) -> bool;

    /// Graph the model is bound to, once set up.
    fn graph(&self) -> Option<&dyn Graph>;

    /// Mutable graph, once set up.
    fn graph_mut(&mut self) -> Option<&mut dyn Graph>;

    /// Model-level observable named `name`, for [`crate::EntityScope::Model`] outputs.
    fn custom_output(&self, _name: &str) -> Option<Value> {
        None
    }
}

type GraphFactory = Arc<dyn Fn() -> Option<Box<dyn Graph>> + Send + Sync>;
type ModelFactory = Arc<dyn Fn() -> Option<Box<dyn Model>> + Send + Sync>;

/// Registered graph-topology plugin.
pub struct GraphPlugin {
    id: String,
    attrs_scope: AttributesScope,
    factory: GraphFactory,
}

impl GraphPlugin {
    /// Describes a graph plugin; `factory` creates one instance per trial.
    pub fn new<F>(id: impl Into<String>, attrs_scope: AttributesScope, factory: F) -> Self
    where
        F: Fn() -> Option<Box<dyn Graph>> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            attrs_scope,
            factory: Arc::new(factory),
        }
    }

    /// Plugin id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parameters accepted by the plugin.
    pub fn attrs_scope(&self) -> &AttributesScope {
        &self.attrs_scope
    }

    /// New instance, or `None` when the factory refuses.
    pub fn create(&self) -> Option<Box<dyn Graph>> {
        (self.factory)()
    }
}

impl fmt::Debug for GraphPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphPlugin").field("id", &self.id).finish()
    }
}

/// Registered agent-update model plugin.
pub struct ModelPlugin {
    id: String,
    node_attrs_scope: AttributesScope,
    attrs_scope: AttributesScope,
    factory: ModelFactory,
}

impl ModelPlugin {
    /// Describes a model plugin; `node_attrs_scope` is the agent state it expects.
    pub fn new<F>(
        id: impl Into<String>,
        node_attrs_scope: AttributesScope,
        attrs_scope: AttributesScope,
        factory: F,
    ) -> Self
    where
        F: Fn() -> Option<Box<dyn Model>> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            node_attrs_scope,
            attrs_scope,
            factory: Arc::new(factory),
        }
    }

    /// Plugin id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Agent attributes the model reads and writes.
    pub fn node_attrs_scope(&self) -> &AttributesScope {
        &self.node_attrs_scope
    }

    /// Parameters accepted by the plugin.
    pub fn attrs_scope(&self) -> &AttributesScope {
        &self.attrs_scope
    }

    /// New instance, or `None` when the factory refuses.
    pub fn create(&self) -> Option<Box<dyn Model>> {
        (self.factory)()
    }
}

impl fmt::Debug for ModelPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelPlugin").field("id", &self.id).finish()
    }
}

/// Lookup table from plugin id to plugin descriptor.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    graphs: BTreeMap<String, Arc<GraphPlugin>>,
    models: BTreeMap<String, Arc<ModelPlugin>>,
}

impl PluginRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a graph plugin; ids must be unique.
    pub fn register_graph(&mut self, plugin: GraphPlugin) -> Result<(), SimError> {
        if self.graphs.contains_key(plugin.id()) {
            return Err(duplicate("graph", plugin.id()));
        }
        self.graphs.insert(plugin.id.clone(), Arc::new(plugin));
        Ok(())
    }

    /// Registers a model plugin; ids must be unique.
    pub fn register_model(&mut self, plugin: ModelPlugin) -> Result<(), SimError> {
        if self.models.contains_key(plugin.id()) {
            return Err(duplicate("model", plugin.id()));
        }
        self.models.insert(plugin.id.clone(), Arc::new(plugin));
        Ok(())
    }

    /// Graph plugin registered under `id`.
    pub fn graph(&self, id: &str) -> Result<Arc<GraphPlugin>, SimError> {
        self.graphs
            .get(id)
            .cloned()
            .ok_or_else(|| unknown("graph", id))
    }

    /// Model plugin registered under `id`.
    pub fn model(&self, id: &str) -> Result<Arc<ModelPlugin>, SimError> {
        self.models
            .get(id)
            .cloned()
            .ok_or_else(|| unknown("model", id))
    }

    /// Registered graph ids, sorted.
    pub fn graph_ids(&self) -> impl Iterator<Item = &str> {
        self.graphs.keys().map(String::as_str)
    }

    /// Registered model ids, sorted.
    pub fn model_ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

fn duplicate(kind: &str, id: &str) -> SimError {
    SimError::Config(
        ErrorInfo::new("duplicate-plugin", "plugin id already registered")
            .with_context("kind", kind)
            .with_context("id", id),
    )
}

fn unknown(kind: &str, id: &str) -> SimError {
    SimError::Config(
        ErrorInfo::new("unknown-plugin", "no plugin registered under this id")
            .with_context("kind", kind)
            .with_context("id", id),
    )
}
