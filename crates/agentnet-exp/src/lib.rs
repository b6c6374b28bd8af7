#![deny(missing_docs)]
//! Experiment and trial scheduling for stochastic multi-agent network simulations.
//!
//! An [`Experiment`] owns a configuration, lazily constructs one [`Trial`]
//! per id with its own graph, model and generator, and steps trials up to a
//! pause horizon. Observations flow into shared [`Output`] sinks and, when
//! configured, into one CSV file per trial.

pub mod config;
pub mod context;
mod events;
pub mod experiment;
mod files;
pub mod manager;
pub mod output;
pub mod plugin;
mod status;
mod trial;

pub use config::{ExpConfig, FileOutputs};
pub use context::{Settings, SimContext};
pub use events::ExperimentEvent;
pub use experiment::{Experiment, PROGRESS_MAX};
pub use manager::{Dispatcher, ExperimentManager};
pub use output::{Cache, EntityScope, Output, OutputFn, OutputSpec};
pub use plugin::{GraphPlugin, Model, ModelPlugin, PluginRegistry};
pub use status::Status;
pub use trial::Trial;
