//! Per-experiment configuration and its YAML/JSON loaders.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use agentnet_core::errors::{ErrorInfo, SimError};
use agentnet_core::{Attributes, MAX_STEPS};
use serde::{Deserialize, Serialize};

use crate::output::OutputSpec;

/// Inputs of a single experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpConfig {
    /// Experiment identifier, unique within its project.
    pub id: u32,
    /// Number of independent trials.
    pub trials: u32,
    /// Step at which every trial stops.
    pub stop_at: u32,
    /// Base seed; trial `t` is seeded with `seed + t`.
    #[serde(default)]
    pub seed: u64,
    /// Graph plugin id.
    pub graph_id: String,
    /// `undirected` or `directed`.
    #[serde(default = "default_graph_type")]
    pub graph_type: String,
    /// Model plugin id.
    pub model_id: String,
    /// Node-construction command.
    pub nodes: String,
    /// Parameters handed to the graph plugin.
    #[serde(default)]
    pub graph_params: Attributes,
    /// Parameters handed to the model plugin.
    #[serde(default)]
    pub model_params: Attributes,
    /// Drop the trial objects once the experiment finished.
    #[serde(default = "default_autodelete")]
    pub autodelete: bool,
    /// CSV outputs written per trial.
    #[serde(default)]
    pub file_outputs: Option<FileOutputs>,
}

fn default_graph_type() -> String {
    "undirected".to_string()
}

fn default_autodelete() -> bool {
    true
}

/// Per-trial CSV files and the outputs they record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOutputs {
    /// Directory receiving `<project>_e<id>_t<trial>.csv`.
    pub directory: PathBuf,
    /// Columns, in order.
    pub outputs: Vec<OutputSpec>,
}

impl ExpConfig {
    /// Parses a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, SimError> {
        serde_yaml::from_str(text).map_err(|err| parse_error("yaml", err))
    }

    /// Parses a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, SimError> {
        serde_json::from_str(text).map_err(|err| parse_error("json", err))
    }

    /// Reads a config file; `.json` files are parsed as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let contents = fs::read_to_string(path)
            .map_err(|err| SimError::io("config-read", path.display(), err))?;
        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        };
        parsed.map_err(|err| match err {
            SimError::Config(info) => {
                SimError::Config(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }

    /// Checks ranges and output declarations.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.trials == 0 || self.trials > u32::from(u16::MAX) {
            return Err(SimError::Config(
                ErrorInfo::new("invalid-trials", "number of trials out of range")
                    .with_context("trials", self.trials.to_string())
                    .with_hint("use between 1 and 65535 trials"),
            ));
        }
        if self.stop_at == 0 || self.stop_at > MAX_STEPS {
            return Err(SimError::Config(
                ErrorInfo::new("invalid-stop-at", "stop step out of range")
                    .with_context("stop_at", self.stop_at.to_string())
                    .with_hint(format!("use between 1 and {MAX_STEPS} steps")),
            ));
        }
        if self.graph_id.trim().is_empty() || self.model_id.trim().is_empty() {
            return Err(SimError::Config(ErrorInfo::new(
                "missing-plugin-id",
                "graph and model ids are required",
            )));
        }
        if let Some(files) = &self.file_outputs {
            if files.outputs.is_empty() {
                return Err(SimError::Config(
                    ErrorInfo::new("empty-file-outputs", "file outputs declare no column")
                        .with_context("directory", files.directory.display().to_string()),
                ));
            }
            for spec in &files.outputs {
                spec.validate()?;
            }
        }
        Ok(())
    }

    /// Trial count as the identifier type.
    pub fn num_trials(&self) -> u16 {
        u16::try_from(self.trials).unwrap_or(u16::MAX)
    }

    /// Every trial id of the experiment.
    pub fn trial_ids(&self) -> BTreeSet<u16> {
        (0..self.num_trials()).collect()
    }
}

fn parse_error(format: &str, err: impl ToString) -> SimError {
    SimError::Config(
        ErrorInfo::new("config-parse", err.to_string()).with_context("format", format),
    )
}
