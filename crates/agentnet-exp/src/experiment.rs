//! Experiment lifecycle: lazy trial construction, stepping, progress and
//! incremental CSV output.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use agentnet_core::errors::{ErrorInfo, SimError};
use agentnet_core::{trial_seed, Prg};
use agentnet_graph::{GraphType, NodeSet};
use crossbeam_channel::Receiver;
use log::{debug, info, warn};

use crate::config::ExpConfig;
use crate::context::SimContext;
use crate::events::{ExperimentEvent, Notifier};
use crate::files::TrialFiles;
use crate::manager::Dispatcher;
use crate::output::{Cache, Output, OutputSpec};
use crate::plugin::{GraphPlugin, ModelPlugin};
use crate::status::Status;
use crate::trial::{Trial, TrialInstance};

/// Full circle; progress is reported in `0..=PROGRESS_MAX`.
pub const PROGRESS_MAX: u16 = 360;

struct Plugins {
    graph: Arc<GraphPlugin>,
    model: Arc<ModelPlugin>,
}

struct State {
    status: Status,
    config: Arc<ExpConfig>,
    plugins: Option<Plugins>,
    trials: BTreeMap<u16, Arc<Trial>>,
    clonable_nodes: Option<NodeSet>,
    outputs: Vec<Arc<Output>>,
    files: Option<Arc<TrialFiles>>,
    in_pass: bool,
}

/// A batch of independent trials sharing one configuration.
///
/// Control operations may be called from any thread. Trial construction is
/// serialized by the experiment lock; stepping a trial only holds that
/// trial's own lock.
pub struct Experiment {
    id: u32,
    project: String,
    ctx: Arc<SimContext>,
    state: Mutex<State>,
    pause_at: AtomicU32,
    delay_ms: AtomicU64,
    progress: AtomicU16,
    node_set_clones: AtomicUsize,
    events: Notifier,
}

impl Experiment {
    /// Creates an experiment and applies `config`.
    ///
    /// A configuration that cannot be applied leaves the experiment
    /// `Invalid`; call [`Experiment::initialize`] with corrected inputs.
    pub fn new(ctx: Arc<SimContext>, project: impl Into<String>, config: ExpConfig) -> Arc<Self> {
        let exp = Arc::new(Self {
            id: config.id,
            project: project.into(),
            ctx,
            state: Mutex::new(State {
                status: Status::Invalid,
                config: Arc::new(config.clone()),
                plugins: None,
                trials: BTreeMap::new(),
                clonable_nodes: None,
                outputs: Vec::new(),
                files: None,
                in_pass: false,
            }),
            pause_at: AtomicU32::new(0),
            delay_ms: AtomicU64::new(0),
            progress: AtomicU16::new(0),
            node_set_clones: AtomicUsize::new(0),
            events: Notifier::default(),
        });
        if let Err(err) = exp.initialize(config) {
            warn!("{}: experiment left invalid: {err}", exp.label());
        }
        exp
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn label(&self) -> String {
        format!("{} (E{})", self.project, self.id)
    }

    fn state_error(&self, code: &str, message: &str, status: Status) -> SimError {
        SimError::State(
            ErrorInfo::new(code, message)
                .with_context("project", self.project.clone())
                .with_context("experiment", self.id.to_string())
                .with_context("status", status.as_str()),
        )
    }

    /// Replaces the inputs and rearms the experiment.
    ///
    /// Refused while `Running` or `Queued`. Previous outputs are discarded.
    pub fn initialize(&self, config: ExpConfig) -> Result<(), SimError> {
        let mut state = self.lock();
        if matches!(state.status, Status::Running | Status::Queued) {
            warn!("{}: cannot initialize a running or queued experiment", self.label());
            return Err(self.state_error(
                "experiment-busy",
                "experiment cannot be initialized while running or queued",
                state.status,
            ));
        }
        self.check_no_pass(&state)?;
        config.validate()?;

        let registry = self.ctx.registry();
        let plugins = registry
            .graph(&config.graph_id)
            .and_then(|graph| Ok((graph, registry.model(&config.model_id)?)))
            .and_then(|(graph, model)| {
                graph.attrs_scope().validate(&config.graph_params)?;
                model.attrs_scope().validate(&config.model_params)?;
                Ok(Plugins { graph, model })
            });

        state.outputs.clear();
        state.files = None;
        state.trials.clear();
        state.clonable_nodes = None;
        state.config = Arc::new(config);

        let plugins = match plugins {
            Ok(plugins) => plugins,
            Err(err) => {
                state.plugins = None;
                state.status = Status::Invalid;
                drop(state);
                self.events.emit([ExperimentEvent::StatusChanged(Status::Invalid)]);
                return Err(err);
            }
        };
        state.plugins = Some(plugins);

        if let Some(file_outputs) = state.config.file_outputs.clone() {
            let trial_ids = state.config.trial_ids();
            let mut header = Vec::new();
            let mut caches = Vec::with_capacity(file_outputs.outputs.len());
            for spec in file_outputs.outputs {
                header.extend(spec.printable_header());
                let output = find_or_insert(&mut state.outputs, spec);
                caches.push(output.add_cache(trial_ids.clone()));
            }
            state.files = Some(Arc::new(TrialFiles::new(
                &file_outputs.directory,
                &self.project,
                self.id,
                header,
                caches,
            )));
        }
        drop(state);

        info!("{}: initialized", self.label());
        self.reset()
    }

    /// Drops every trial and rearms the experiment at step zero.
    ///
    /// Refused while `Running` or `Queued`, and while a pass started with
    /// [`Experiment::begin_pass`] has not been completed, even if that pass
    /// invalidated the experiment. An experiment whose plugins could not be
    /// resolved stays `Invalid`.
    pub fn reset(&self) -> Result<(), SimError> {
        let mut state = self.lock();
        if matches!(state.status, Status::Running | Status::Queued) {
            warn!("{}: cannot reset a running or queued experiment", self.label());
            return Err(self.state_error(
                "experiment-busy",
                "experiment cannot be reset while running or queued",
                state.status,
            ));
        }
        self.check_no_pass(&state)?;
        state.trials.clear();
        state.clonable_nodes = None;
        for output in &state.outputs {
            output.flush_all();
        }
        self.pause_at.store(state.config.stop_at, Ordering::Release);
        self.delay_ms
            .store(self.ctx.settings().default_step_delay_ms, Ordering::Relaxed);
        state.status = if state.plugins.is_some() {
            Status::Ready
        } else {
            Status::Invalid
        };
        let status = state.status;
        let progress_changed = self.progress.swap(0, Ordering::AcqRel) != 0;
        drop(state);

        info!("{}: reset", self.label());
        let mut events = vec![
            ExperimentEvent::StatusChanged(status),
            ExperimentEvent::Restarted,
        ];
        if progress_changed {
            events.push(ExperimentEvent::ProgressUpdated(0));
        }
        self.events.emit(events);
        Ok(())
    }

    fn check_no_pass(&self, state: &State) -> Result<(), SimError> {
        if state.in_pass {
            warn!("{}: a stepping pass is still in flight", self.label());
            return Err(self.state_error(
                "pass-in-flight",
                "a stepping pass has not completed yet",
                state.status,
            ));
        }
        Ok(())
    }

    fn apply_transition(&self, state: &mut State, to: Status) -> Result<(), SimError> {
        let from = state.status;
        if !from.can_transition_to(to) {
            return Err(self
                .state_error("illegal-transition", "status transition not allowed", from)
                .map_info(|info| info.with_context("to", to.as_str())));
        }
        state.status = to;
        Ok(())
    }

    /// Applies a status change if the transition table allows it.
    pub fn transition(&self, to: Status) -> Result<(), SimError> {
        let mut state = self.lock();
        if state.status == to && to == Status::Invalid {
            return Ok(());
        }
        self.apply_transition(&mut state, to)?;
        drop(state);
        self.events.emit([ExperimentEvent::StatusChanged(to)]);
        Ok(())
    }

    /// Moves the experiment to `Running` and opens a stepping pass.
    ///
    /// The pass stays open until [`Experiment::complete_pass`], which keeps
    /// `reset` and `initialize` away from workers still stepping trials.
    pub fn begin_pass(&self) -> Result<(), SimError> {
        let mut state = self.lock();
        self.apply_transition(&mut state, Status::Running)?;
        state.in_pass = true;
        drop(state);
        self.events.emit([ExperimentEvent::StatusChanged(Status::Running)]);
        Ok(())
    }

    fn invalidate(&self) {
        if self.transition(Status::Invalid).is_ok() {
            self.pause();
        }
    }

    /// Settles a stepping pass: `Finished` once every trial finished,
    /// `Ready` otherwise. Closes the open pass; the status only changes
    /// for a `Running` experiment.
    pub fn complete_pass(&self) -> Status {
        let mut state = self.lock();
        state.in_pass = false;
        if state.status != Status::Running {
            return state.status;
        }
        let expected = usize::from(state.config.num_trials());
        let finished = state.trials.len() == expected
            && state
                .trials
                .values()
                .all(|trial| trial.status() == Status::Finished);
        let to = if finished {
            Status::Finished
        } else {
            Status::Ready
        };
        state.status = to;
        if finished {
            info!("{}: finished", self.label());
            if state.config.autodelete {
                state.trials.clear();
                state.clonable_nodes = None;
            }
        }
        drop(state);
        self.events.emit([ExperimentEvent::StatusChanged(to)]);
        self.update_progress();
        to
    }

    /// Recomputes progress; emits an event when the value changed.
    pub fn update_progress(&self) -> u16 {
        let state = self.lock();
        let last = self.progress.load(Ordering::Acquire);
        let value = match state.status {
            Status::Finished => PROGRESS_MAX,
            Status::Invalid => 0,
            Status::Running => {
                let pause_at = f64::from(self.pause_at.load(Ordering::Acquire).max(1));
                let trials = f64::from(state.config.num_trials().max(1));
                let done: f64 = state
                    .trials
                    .values()
                    .map(|trial| f64::from(trial.curr_step()) / pause_at)
                    .sum();
                let value = (done * f64::from(PROGRESS_MAX) / trials).ceil();
                // 360 is reserved for Finished
                value.clamp(0.0, f64::from(PROGRESS_MAX - 1)) as u16
            }
            Status::Ready | Status::Queued => last,
        };
        let changed = value != last;
        if changed {
            self.progress.store(value, Ordering::Release);
        }
        drop(state);
        if changed {
            self.events
                .emit_with(|| ExperimentEvent::ProgressUpdated(self.progress()));
        }
        value
    }

    /// Returns the trial `trial_id`, constructing it on first use.
    ///
    /// At most one trial object is ever built per id, whichever thread asks
    /// first. Construction failures are returned to the caller.
    pub fn ensure_trial(&self, trial_id: u16) -> Result<Arc<Trial>, SimError> {
        let mut state = self.lock();
        if let Some(trial) = state.trials.get(&trial_id) {
            return Ok(Arc::clone(trial));
        }
        let trial = self.create_trial(&mut state, trial_id)?;
        drop(state);
        self.events.emit([ExperimentEvent::TrialCreated(trial_id)]);
        Ok(trial)
    }

    fn create_trial(
        &self,
        state: &mut State,
        trial_id: u16,
    ) -> Result<Arc<Trial>, SimError> {
        if state.status == Status::Invalid {
            return Err(self.state_error(
                "experiment-invalid",
                "trials cannot be created for an invalid experiment",
                state.status,
            ));
        }
        if self.pause_at() == 0 {
            return Err(self.state_error(
                "creation-paused",
                "experiment was paused before the trial was created",
                state.status,
            ));
        }
        let num_trials = state.config.num_trials();
        if trial_id >= num_trials || state.trials.len() >= usize::from(num_trials) {
            panic!(
                "{}: cannot create trial {trial_id}, the experiment holds {} of {num_trials} trials",
                self.label(),
                state.trials.len()
            );
        }
        let Some(plugins) = state.plugins.as_ref() else {
            return Err(self.state_error(
                "experiment-invalid",
                "plugins are not resolved",
                state.status,
            ));
        };
        let graph_plugin = Arc::clone(&plugins.graph);
        let model_plugin = Arc::clone(&plugins.model);
        let config = Arc::clone(&state.config);

        let nodes = self.create_nodes(state, &config, &model_plugin)?;
        let graph_type = nodes.graph_type();
        let mut prg = Prg::from_seed(trial_seed(config.seed, trial_id));

        let mut graph = graph_plugin.create().ok_or_else(|| {
            self.trial_error(SimError::Graph(ErrorInfo::new(
                "graph-create",
                "graph plugin returned no instance",
            )), trial_id)
        })?;
        graph
            .setup(&mut prg, &config.graph_params, nodes, graph_type)
            .and_then(|()| graph.init(&mut prg))
            .map_err(|err| self.trial_error(err, trial_id))?;
        graph.reset();

        let mut model = model_plugin.create().ok_or_else(|| {
            self.trial_error(SimError::Model(ErrorInfo::new(
                "model-create",
                "model plugin returned no instance",
            )), trial_id)
        })?;
        model
            .setup(&mut prg, &config.model_params, graph)
            .and_then(|()| model.init(&mut prg))
            .map_err(|err| self.trial_error(err, trial_id))?;

        for output in &state.outputs {
            output.do_operation(trial_id, &*model);
        }
        if let Some(files) = &state.files {
            files
                .create(trial_id)
                .and_then(|()| files.write_cached_steps(trial_id))
                .map_err(|err| self.trial_error(err, trial_id))?;
        }

        let trial = Arc::new(Trial::new(trial_id, prg, model));
        state.trials.insert(trial_id, Arc::clone(&trial));
        Ok(trial)
    }

    fn trial_error(&self, err: SimError, trial_id: u16) -> SimError {
        warn!(
            "{} (E{}:T{trial_id}): unable to create the trial: {err}",
            self.project, self.id
        );
        err.map_info(|info| {
            info.with_context("project", self.project.clone())
                .with_context("experiment", self.id.to_string())
                .with_context("trial", trial_id.to_string())
        })
    }

    /// Node set for the next trial: built once, branched for every trial
    /// but the last, which takes the cached set itself.
    fn create_nodes(
        &self,
        state: &mut State,
        config: &ExpConfig,
        model_plugin: &ModelPlugin,
    ) -> Result<NodeSet, SimError> {
        let num_trials = usize::from(config.num_trials());
        if state.clonable_nodes.is_some() {
            if state.trials.len() + 1 == num_trials {
                if let Some(nodes) = state.clonable_nodes.take() {
                    return Ok(nodes);
                }
            } else if let Some(nodes) = state.clonable_nodes.as_ref() {
                self.node_set_clones.fetch_add(1, Ordering::Relaxed);
                return Ok(nodes.branch());
            }
        }
        debug_assert!(
            state.trials.is_empty(),
            "node set rebuilt after trials were created"
        );

        let graph_type = GraphType::from_name(&config.graph_type);
        let nodes = NodeSet::from_cmd(&config.nodes, model_plugin.node_attrs_scope(), graph_type)
            .map_err(|err| {
                warn!("{}: unable to create the nodes: {err}", self.label());
                err
            })?;
        if num_trials > 1 {
            self.node_set_clones.fetch_add(1, Ordering::Relaxed);
            state.clonable_nodes = Some(nodes.branch());
        }
        Ok(nodes)
    }

    /// Advances `trial_id` until the pause horizon, the stop step or
    /// convergence, constructing the trial on first use.
    ///
    /// No-op for an `Invalid` or `Finished` experiment and for trials that
    /// are already being stepped or done. Failures invalidate the experiment.
    pub fn process_trial(&self, trial_id: u16) {
        let (config, outputs, files) = {
            let state = self.lock();
            if matches!(state.status, Status::Invalid | Status::Finished) {
                return;
            }
            (
                Arc::clone(&state.config),
                state.outputs.clone(),
                state.files.clone(),
            )
        };

        let trial = match self.ensure_trial(trial_id) {
            Ok(trial) => trial,
            Err(err) if err.code() == "creation-paused" => return,
            Err(err) => {
                warn!("{}: trial {trial_id} failed: {err}", self.label());
                self.invalidate();
                return;
            }
        };
        if !trial.try_begin() {
            return;
        }

        let steps_to_flush = self.ctx.steps_to_flush();
        let started = Instant::now();
        let mut converged = false;
        {
            let mut guard = trial.lock();
            let TrialInstance { prg, model } = &mut *guard;
            while !converged && trial.curr_step() < self.pause_at() {
                converged = model.algorithm_step(prg);
                let step = trial.advance();
                for output in &outputs {
                    output.do_operation(trial_id, &**model);
                }
                if step % steps_to_flush == 0 {
                    if let Some(files) = &files {
                        if let Err(err) = files.write_cached_steps(trial_id) {
                            drop(guard);
                            self.fail_trial(&trial, err);
                            return;
                        }
                    }
                }
                let delay = self.delay();
                if delay > 0 {
                    thread::sleep(Duration::from_millis(delay));
                }
            }
        }
        debug!(
            "{} (E{}:T{trial_id}) - {}s",
            self.project,
            self.id,
            started.elapsed().as_secs_f64()
        );

        if converged || trial.curr_step() >= config.stop_at {
            if let Some(files) = &files {
                if let Err(err) = files.write_cached_steps(trial_id) {
                    self.fail_trial(&trial, err);
                    return;
                }
            }
            trial.set_status(Status::Finished);
        } else {
            trial.set_status(Status::Ready);
        }
    }

    fn fail_trial(&self, trial: &Trial, err: SimError) {
        warn!(
            "{} (E{}:T{}): unable to write the output file: {err}",
            self.project,
            self.id,
            trial.id()
        );
        trial.set_status(Status::Invalid);
        self.invalidate();
    }

    /// Appends the buffered rows of `trial_id` to its CSV file.
    ///
    /// Returns the number of rows written; zero when no file output is
    /// configured or nothing is pending.
    pub fn write_cached_steps(&self, trial_id: u16) -> Result<usize, SimError> {
        let files = self.lock().files.clone();
        match files {
            Some(files) => files.write_cached_steps(trial_id),
            None => Ok(0),
        }
    }

    /// Path of the CSV file of `trial_id`, when file outputs are configured.
    pub fn output_path(&self, trial_id: u16) -> Option<std::path::PathBuf> {
        self.lock().files.as_ref().map(|files| files.path(trial_id))
    }

    /// Column names of the CSV files.
    pub fn file_header(&self) -> Vec<String> {
        self.lock()
            .files
            .as_ref()
            .map(|files| files.header().to_vec())
            .unwrap_or_default()
    }

    fn max_curr_step(state: &State) -> u32 {
        state
            .trials
            .values()
            .map(|trial| trial.curr_step())
            .max()
            .unwrap_or(0)
    }

    /// Stops every trial at the furthest step already reached.
    ///
    /// Trials finish their current step first. Pausing before any trial
    /// exists prevents their creation until the horizon is raised.
    pub fn pause(&self) {
        self.set_pause_at(0);
    }

    /// Moves the pause horizon, clamped to `[max current step, stop_at]`.
    pub fn set_pause_at(&self, step: u32) -> u32 {
        let state = self.lock();
        let step = step
            .max(Self::max_curr_step(&state))
            .min(state.config.stop_at);
        self.pause_at.store(step, Ordering::Release);
        step
    }

    /// Current pause horizon.
    pub fn pause_at(&self) -> u32 {
        self.pause_at.load(Ordering::Acquire)
    }

    /// Step at which trials stop.
    pub fn stop_at(&self) -> u32 {
        self.lock().config.stop_at
    }

    /// Runs, pauses or unqueues the experiment depending on its status.
    pub fn toggle(self: &Arc<Self>, dispatcher: &dyn Dispatcher) {
        match self.status() {
            Status::Running => self.pause(),
            Status::Ready => self.play(dispatcher),
            Status::Queued => dispatcher.dequeue(self),
            Status::Invalid | Status::Finished => {}
        }
    }

    /// Hands a `Ready` experiment to `dispatcher`.
    ///
    /// A horizon left at or below the furthest step, as after
    /// [`Experiment::pause`], is raised back to `stop_at`.
    pub fn play(self: &Arc<Self>, dispatcher: &dyn Dispatcher) {
        {
            let state = self.lock();
            if state.status != Status::Ready {
                return;
            }
            if self.pause_at() <= Self::max_curr_step(&state) {
                self.pause_at.store(state.config.stop_at, Ordering::Release);
            }
        }
        dispatcher.play(Arc::clone(self));
    }

    /// Runs a `Ready` experiment for exactly one more step.
    pub fn play_next(self: &Arc<Self>, dispatcher: &dyn Dispatcher) {
        if self.status() != Status::Ready {
            return;
        }
        {
            let state = self.lock();
            let next = Self::max_curr_step(&state)
                .saturating_add(1)
                .min(state.config.stop_at);
            self.pause_at.store(next, Ordering::Release);
        }
        dispatcher.play(Arc::clone(self));
    }

    /// Registers a consumer for `spec`, reusing an equal output if present.
    ///
    /// Only allowed while `Ready`.
    pub fn add_output(
        &self,
        spec: OutputSpec,
        trial_ids: BTreeSet<u16>,
    ) -> Result<Arc<Cache>, SimError> {
        let mut state = self.lock();
        if state.status != Status::Ready {
            return Err(self.state_error(
                "experiment-not-ready",
                "outputs can only be added to a ready experiment",
                state.status,
            ));
        }
        spec.validate()?;
        let output = find_or_insert(&mut state.outputs, spec);
        Ok(output.add_cache(trial_ids))
    }

    /// Unregisters `output`.
    ///
    /// Refused unless `Ready`, while rows are pending, and for outputs
    /// backing the CSV files.
    pub fn remove_output(&self, output: &Arc<Output>) -> Result<(), SimError> {
        let mut state = self.lock();
        if state.status != Status::Ready {
            return Err(self.state_error(
                "experiment-not-ready",
                "outputs can only be removed from a ready experiment",
                state.status,
            ));
        }
        let refused = |code: &str, message: &str| {
            SimError::Output(
                ErrorInfo::new(code, message).with_context("output", output.spec().to_string()),
            )
        };
        let Some(idx) = state.outputs.iter().position(|o| Arc::ptr_eq(o, output)) else {
            return Err(refused("unknown-output", "output is not registered"));
        };
        if !output.is_empty() {
            return Err(refused("output-not-empty", "output still holds pending rows"));
        }
        let backs_files = state.config.file_outputs.as_ref().map_or(false, |files| {
            files.outputs.iter().any(|spec| spec == output.spec())
        });
        if backs_files {
            return Err(refused("file-output", "output feeds the trial files"));
        }
        state.outputs.remove(idx);
        Ok(())
    }

    /// Registered output equal to `spec`.
    pub fn search_output(&self, spec: &OutputSpec) -> Option<Arc<Output>> {
        self.lock()
            .outputs
            .iter()
            .find(|output| output.spec() == spec)
            .cloned()
    }

    /// Every registered output.
    pub fn outputs(&self) -> Vec<Arc<Output>> {
        self.lock().outputs.clone()
    }

    /// Event stream; events are sent after internal locks are released.
    pub fn subscribe(&self) -> Receiver<ExperimentEvent> {
        self.events.subscribe()
    }

    /// Experiment identifier.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Owning project name, used in file names and diagnostics.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Current status.
    pub fn status(&self) -> Status {
        self.lock().status
    }

    /// Last computed progress, in `0..=360`.
    pub fn progress(&self) -> u16 {
        self.progress.load(Ordering::Acquire)
    }

    /// Current inputs.
    pub fn config(&self) -> Arc<ExpConfig> {
        Arc::clone(&self.lock().config)
    }

    /// Configured number of trials.
    pub fn num_trials(&self) -> u16 {
        self.lock().config.num_trials()
    }

    /// Number of trials constructed so far.
    pub fn trials_count(&self) -> usize {
        self.lock().trials.len()
    }

    /// Trial `trial_id`, if constructed.
    pub fn trial(&self, trial_id: u16) -> Option<Arc<Trial>> {
        self.lock().trials.get(&trial_id).cloned()
    }

    /// Delay applied after every step, in milliseconds.
    pub fn delay(&self) -> u64 {
        self.delay_ms.load(Ordering::Relaxed)
    }

    /// Sets the per-step delay.
    pub fn set_delay(&self, ms: u64) {
        self.delay_ms.store(ms, Ordering::Relaxed);
    }

    /// Number of node sets copied from the cached one since creation.
    pub fn node_set_clones(&self) -> usize {
        self.node_set_clones.load(Ordering::Relaxed)
    }
}

impl Drop for Experiment {
    fn drop(&mut self) {
        if thread::panicking() {
            return;
        }
        let status = self
            .state
            .get_mut()
            .map_or(Status::Invalid, |state| state.status);
        debug_assert!(
            !matches!(status, Status::Running | Status::Queued),
            "{}: experiment dropped while {status}",
            self.label()
        );
    }
}

impl std::fmt::Debug for Experiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Experiment")
            .field("project", &self.project)
            .field("id", &self.id)
            .field("pause_at", &self.pause_at())
            .field("progress", &self.progress())
            .finish()
    }
}

fn find_or_insert(outputs: &mut Vec<Arc<Output>>, spec: OutputSpec) -> Arc<Output> {
    if let Some(output) = outputs.iter().find(|output| output.spec() == &spec) {
        return Arc::clone(output);
    }
    let output = Arc::new(Output::new(spec));
    outputs.push(Arc::clone(&output));
    output
}
