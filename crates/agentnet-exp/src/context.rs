//! Plugin registry and process-level settings.

use std::sync::{PoisonError, RwLock};
use std::thread;

use serde::{Deserialize, Serialize};

use crate::plugin::PluginRegistry;

/// Process-level knobs shared by every experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Delay applied after every step of a freshly reset experiment.
    #[serde(default)]
    pub default_step_delay_ms: u64,
    /// Number of steps between two incremental CSV flushes.
    #[serde(default = "default_steps_to_flush")]
    pub steps_to_flush: u32,
    /// Size of the dispatcher worker pool.
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,
}

fn default_steps_to_flush() -> u32 {
    10_000
}

fn default_max_threads() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_step_delay_ms: 0,
            steps_to_flush: default_steps_to_flush(),
            max_threads: default_max_threads(),
        }
    }
}

/// Explicit environment handed to experiments: plugins plus settings.
#[derive(Debug, Default)]
pub struct SimContext {
    registry: PluginRegistry,
    settings: RwLock<Settings>,
}

impl SimContext {
    /// Context with default settings.
    pub fn new(registry: PluginRegistry) -> Self {
        Self::with_settings(registry, Settings::default())
    }

    /// Context with explicit settings.
    pub fn with_settings(registry: PluginRegistry, settings: Settings) -> Self {
        Self {
            registry,
            settings: RwLock::new(settings),
        }
    }

    /// Registered plugins.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Flush interval, never below one step.
    pub fn steps_to_flush(&self) -> u32 {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .steps_to_flush
            .max(1)
    }

    /// Changes the flush interval of running and future trials.
    pub fn set_steps_to_flush(&self, steps: u32) {
        self.update(|settings| settings.steps_to_flush = steps.max(1));
    }

    /// Changes the delay picked up by experiments on their next reset.
    pub fn set_default_step_delay(&self, ms: u64) {
        self.update(|settings| settings.default_step_delay_ms = ms);
    }

    /// Restores every knob to its default.
    pub fn reset_settings(&self) {
        self.update(|settings| *settings = Settings::default());
    }

    fn update(&self, f: impl FnOnce(&mut Settings)) {
        let mut guard = self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}
