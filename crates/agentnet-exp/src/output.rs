//! Output sinks recording per-step observations of trials.
//!
//! An [`Output`] is identified by its [`OutputSpec`] and shared by every
//! consumer asking for the same observable. Each consumer owns a [`Cache`]
//! with its own set of trial ids and one FIFO row buffer per trial.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use agentnet_core::errors::{ErrorInfo, SimError};
use agentnet_core::Value;
use serde::{Deserialize, Serialize};

use crate::plugin::Model;

/// Entities an output observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityScope {
    /// Node attributes.
    Nodes,
    /// Edge attributes.
    Edges,
    /// Model-level observable exposed through [`Model::custom_output`].
    Model,
}

impl EntityScope {
    /// Lowercase name used in column headers.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityScope::Nodes => "nodes",
            EntityScope::Edges => "edges",
            EntityScope::Model => "model",
        }
    }
}

/// Reduction applied to the observed attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "lowercase")]
pub enum OutputFn {
    /// Model observable, unreduced.
    Raw,
    /// Number of entities whose attribute equals each listed value.
    Count {
        /// Values to count, one column each.
        values: Vec<Value>,
    },
    /// Sum over entities.
    Sum,
    /// Arithmetic mean over entities.
    Mean,
    /// Smallest value.
    Min,
    /// Largest value.
    Max,
}

impl OutputFn {
    fn name(&self) -> &'static str {
        match self {
            OutputFn::Raw => "raw",
            OutputFn::Count { .. } => "count",
            OutputFn::Sum => "sum",
            OutputFn::Mean => "mean",
            OutputFn::Min => "min",
            OutputFn::Max => "max",
        }
    }
}

/// Identity of an output: what is observed and how it is reduced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Observed entities.
    pub entity: EntityScope,
    /// Attribute name, or observable name for model outputs.
    pub attr: String,
    /// Reduction.
    #[serde(flatten)]
    pub function: OutputFn,
}

impl OutputSpec {
    /// Shorthand constructor.
    pub fn new(entity: EntityScope, attr: impl Into<String>, function: OutputFn) -> Self {
        Self {
            entity,
            attr: attr.into(),
            function,
        }
    }

    /// Rejects reductions that do not apply to the entity scope.
    pub fn validate(&self) -> Result<(), SimError> {
        let valid = match (&self.entity, &self.function) {
            (EntityScope::Model, OutputFn::Raw) => true,
            (EntityScope::Model, _) | (_, OutputFn::Raw) => false,
            (_, OutputFn::Count { values }) => !values.is_empty(),
            _ => true,
        };
        if !valid || self.attr.trim().is_empty() {
            return Err(SimError::Config(
                ErrorInfo::new("invalid-output", "output function does not apply to entity")
                    .with_context("entity", self.entity.as_str())
                    .with_context("function", self.function.name())
                    .with_context("attr", self.attr.clone()),
            ));
        }
        Ok(())
    }

    /// Column names, one per value of a row.
    pub fn printable_header(&self) -> Vec<String> {
        let entity = self.entity.as_str();
        match &self.function {
            OutputFn::Raw => vec![self.attr.clone()],
            OutputFn::Count { values } => values
                .iter()
                .map(|v| format!("count_{entity}_{}_{v}", self.attr))
                .collect(),
            other => vec![format!("{}_{entity}_{}", other.name(), self.attr)],
        }
    }

    /// Number of values in a row.
    pub fn width(&self) -> usize {
        match &self.function {
            OutputFn::Count { values } => values.len(),
            _ => 1,
        }
    }

    /// Evaluates the observable on the current state of `model`.
    pub fn evaluate(&self, model: &dyn Model) -> Vec<Value> {
        if self.entity == EntityScope::Model {
            return vec![model.custom_output(&self.attr).unwrap_or_default()];
        }
        let Some(graph) = model.graph() else {
            return vec![Value::Invalid; self.width()];
        };
        let observed: Vec<&Value> = match self.entity {
            EntityScope::Nodes => graph
                .nodes()
                .iter()
                .filter_map(|node| node.attrs.get(&self.attr))
                .collect(),
            _ => graph
                .edges()
                .iter()
                .filter_map(|edge| edge.attrs.get(&self.attr))
                .collect(),
        };
        reduce(&self.function, &observed)
    }
}

impl fmt::Display for OutputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}.{})", self.function.name(), self.entity.as_str(), self.attr)
    }
}

fn reduce(function: &OutputFn, observed: &[&Value]) -> Vec<Value> {
    let numbers = || observed.iter().filter_map(|v| v.to_f64());
    match function {
        OutputFn::Raw => vec![Value::Invalid],
        OutputFn::Count { values } => values
            .iter()
            .map(|wanted| {
                let n = observed.iter().filter(|v| **v == wanted).count();
                Value::Int(n as i64)
            })
            .collect(),
        OutputFn::Sum => vec![Value::Double(numbers().sum())],
        OutputFn::Mean => {
            let (sum, n) = numbers().fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
            if n == 0 {
                vec![Value::Invalid]
            } else {
                vec![Value::Double(sum / n as f64)]
            }
        }
        OutputFn::Min => vec![numbers().reduce(f64::min).map_or(Value::Invalid, Value::Double)],
        OutputFn::Max => vec![numbers().reduce(f64::max).map_or(Value::Invalid, Value::Double)],
    }
}

/// One consumer's view of an output: interested trials and their pending rows.
#[derive(Debug)]
pub struct Cache {
    trial_ids: BTreeSet<u16>,
    rows: Mutex<BTreeMap<u16, VecDeque<Vec<Value>>>>,
}

impl Cache {
    fn new(trial_ids: BTreeSet<u16>) -> Self {
        let rows = trial_ids.iter().map(|&id| (id, VecDeque::new())).collect();
        Self {
            trial_ids,
            rows: Mutex::new(rows),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u16, VecDeque<Vec<Value>>>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Trials this cache records.
    pub fn trial_ids(&self) -> &BTreeSet<u16> {
        &self.trial_ids
    }

    /// Returns true when no trial has a pending row.
    pub fn is_empty(&self) -> bool {
        self.lock().values().all(VecDeque::is_empty)
    }

    /// Returns true when `trial_id` has no pending row.
    pub fn is_empty_for(&self, trial_id: u16) -> bool {
        self.lock().get(&trial_id).map_or(true, VecDeque::is_empty)
    }

    /// Number of pending rows of `trial_id`.
    pub fn len_for(&self, trial_id: u16) -> usize {
        self.lock().get(&trial_id).map_or(0, VecDeque::len)
    }

    /// Appends a row for `trial_id`; ignored for trials outside the cache.
    pub fn push_row(&self, trial_id: u16, row: Vec<Value>) {
        if let Some(queue) = self.lock().get_mut(&trial_id) {
            queue.push_back(row);
        }
    }

    /// Removes and returns the oldest pending row of `trial_id`.
    pub fn pop_front_row(&self, trial_id: u16) -> Option<Vec<Value>> {
        self.lock().get_mut(&trial_id)?.pop_front()
    }

    /// Removes and returns every pending row of `trial_id`, oldest first.
    pub fn drain(&self, trial_id: u16) -> Vec<Vec<Value>> {
        self.lock()
            .get_mut(&trial_id)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// Discards every pending row.
    pub fn clear(&self) {
        for queue in self.lock().values_mut() {
            queue.clear();
        }
    }
}

/// Shared sink for one [`OutputSpec`].
#[derive(Debug)]
pub struct Output {
    spec: OutputSpec,
    caches: Mutex<Vec<Arc<Cache>>>,
}

impl Output {
    pub(crate) fn new(spec: OutputSpec) -> Self {
        Self {
            spec,
            caches: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<Cache>>> {
        self.caches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Identity of the sink.
    pub fn spec(&self) -> &OutputSpec {
        &self.spec
    }

    /// Column names of a row.
    pub fn printable_header(&self) -> Vec<String> {
        self.spec.printable_header()
    }

    /// Attaches a new consumer interested in `trial_ids`.
    pub fn add_cache(&self, trial_ids: BTreeSet<u16>) -> Arc<Cache> {
        let cache = Arc::new(Cache::new(trial_ids));
        self.lock().push(Arc::clone(&cache));
        cache
    }

    /// Detaches a consumer; returns false when it was not attached.
    pub fn remove_cache(&self, cache: &Arc<Cache>) -> bool {
        let mut caches = self.lock();
        let before = caches.len();
        caches.retain(|c| !Arc::ptr_eq(c, cache));
        caches.len() != before
    }

    /// Number of attached consumers.
    pub fn num_caches(&self) -> usize {
        self.lock().len()
    }

    /// Union of the trial ids of every consumer.
    pub fn trial_ids(&self) -> BTreeSet<u16> {
        self.lock()
            .iter()
            .flat_map(|cache| cache.trial_ids().iter().copied())
            .collect()
    }

    /// Returns true when no consumer holds a pending row.
    pub fn is_empty(&self) -> bool {
        self.lock().iter().all(|cache| cache.is_empty())
    }

    /// Records the current state of `model` for every consumer of `trial_id`.
    pub fn do_operation(&self, trial_id: u16, model: &dyn Model) {
        let caches = self.lock();
        let mut interested = caches
            .iter()
            .filter(|cache| cache.trial_ids().contains(&trial_id))
            .peekable();
        if interested.peek().is_none() {
            return;
        }
        let row = self.spec.evaluate(model);
        for cache in interested {
            cache.push_row(trial_id, row.clone());
        }
    }

    /// Discards every pending row of every consumer.
    pub fn flush_all(&self) {
        for cache in self.lock().iter() {
            cache.clear();
        }
    }
}
