use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use agentnet_core::Prg;

use crate::plugin::Model;
use crate::status::Status;

pub(crate) struct TrialInstance {
    pub(crate) prg: Prg,
    pub(crate) model: Box<dyn Model>,
}

/// One independent run of an experiment.
///
/// The model instance and its generator sit behind a mutex held for the
/// whole of a stepping pass; the step counter and status are readable
/// without it.
pub struct Trial {
    id: u16,
    curr_step: AtomicU32,
    status: AtomicU8,
    instance: Mutex<TrialInstance>,
}

impl Trial {
    pub(crate) fn new(id: u16, prg: Prg, model: Box<dyn Model>) -> Self {
        Self {
            id,
            curr_step: AtomicU32::new(0),
            status: AtomicU8::new(Status::Ready.as_u8()),
            instance: Mutex::new(TrialInstance { prg, model }),
        }
    }

    /// Trial identifier.
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Number of steps performed so far.
    pub fn curr_step(&self) -> u32 {
        self.curr_step.load(Ordering::Acquire)
    }

    /// Current status: `Ready`, `Running`, `Finished` or `Invalid`.
    pub fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire))
    }

    pub(crate) fn set_status(&self, status: Status) {
        self.status.store(status.as_u8(), Ordering::Release);
    }

    /// Claims the trial for stepping; only one caller wins.
    pub(crate) fn try_begin(&self) -> bool {
        self.status
            .compare_exchange(
                Status::Ready.as_u8(),
                Status::Running.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Increments the step counter and returns the new value.
    pub(crate) fn advance(&self) -> u32 {
        self.curr_step.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, TrialInstance> {
        self.instance.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` on the model; blocks while the trial is being stepped.
    pub fn with_model<R>(&self, f: impl FnOnce(&dyn Model) -> R) -> R {
        let instance = self.lock();
        f(instance.model.as_ref())
    }
}

impl fmt::Debug for Trial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trial")
            .field("id", &self.id)
            .field("curr_step", &self.curr_step())
            .field("status", &self.status())
            .finish()
    }
}
