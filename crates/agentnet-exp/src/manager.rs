//! Queueing of experiments and parallel stepping of their trials.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use agentnet_core::errors::{ErrorInfo, SimError};
use log::{info, warn};
use rayon::prelude::*;

use crate::context::SimContext;
use crate::experiment::Experiment;
use crate::status::Status;

/// Scheduling surface experiments hand themselves to.
pub trait Dispatcher: Send + Sync {
    /// Queues a `Ready` experiment.
    fn enqueue(&self, exp: Arc<Experiment>);
    /// Removes a `Queued` experiment from the queue, making it `Ready`.
    fn dequeue(&self, exp: &Arc<Experiment>);
    /// Requests that the experiment runs.
    fn play(&self, exp: Arc<Experiment>);
}

/// FIFO dispatcher stepping trials on a dedicated worker pool.
pub struct ExperimentManager {
    pool: rayon::ThreadPool,
    queue: Mutex<VecDeque<Arc<Experiment>>>,
}

impl ExperimentManager {
    /// Manager with `threads` workers.
    pub fn new(threads: usize) -> Result<Self, SimError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|idx| format!("agentnet-worker-{idx}"))
            .build()
            .map_err(|err| {
                SimError::Config(
                    ErrorInfo::new("thread-pool", err.to_string())
                        .with_context("threads", threads.to_string()),
                )
            })?;
        Ok(Self {
            pool,
            queue: Mutex::new(VecDeque::new()),
        })
    }

    /// Manager sized from the context's `max_threads`.
    pub fn from_context(ctx: &SimContext) -> Result<Self, SimError> {
        Self::new(ctx.settings().max_threads)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Arc<Experiment>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pop_front(&self) -> Option<Arc<Experiment>> {
        self.lock().pop_front()
    }

    /// Number of experiments waiting.
    pub fn queued(&self) -> usize {
        self.lock().len()
    }

    /// Runs queued experiments in FIFO order until the queue is empty.
    pub fn run_queued(&self) {
        while let Some(exp) = self.pop_front() {
            self.run(&exp);
        }
    }

    /// Runs one stepping pass of `exp`: every trial id in parallel.
    ///
    /// Accepts `Ready` and `Queued` experiments; returns the status the
    /// pass settled on.
    pub fn run(&self, exp: &Arc<Experiment>) -> Status {
        if let Err(err) = exp.begin_pass() {
            warn!("{} (E{}): not started: {err}", exp.project(), exp.id());
            return exp.status();
        }
        let trial_ids: Vec<u16> = (0..exp.num_trials()).collect();
        self.pool.install(|| {
            trial_ids.par_iter().for_each(|&trial_id| {
                exp.process_trial(trial_id);
                exp.update_progress();
            });
        });
        let status = exp.complete_pass();
        info!("{} (E{}): pass ended {status}", exp.project(), exp.id());
        status
    }
}

impl Dispatcher for ExperimentManager {
    fn enqueue(&self, exp: Arc<Experiment>) {
        let mut queue = self.lock();
        if exp.transition(Status::Queued).is_ok() {
            queue.push_back(exp);
        }
    }

    fn dequeue(&self, exp: &Arc<Experiment>) {
        let mut queue = self.lock();
        let before = queue.len();
        queue.retain(|queued| !Arc::ptr_eq(queued, exp));
        if queue.len() != before {
            if let Err(err) = exp.transition(Status::Ready) {
                warn!("{} (E{}): {err}", exp.project(), exp.id());
            }
        }
    }

    fn play(&self, exp: Arc<Experiment>) {
        self.enqueue(exp);
    }
}

impl std::fmt::Debug for ExperimentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentManager")
            .field("threads", &self.pool.current_num_threads())
            .field("queued", &self.queued())
            .finish()
    }
}
