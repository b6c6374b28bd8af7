//! Structured error types shared across agentnet crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SimError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (project, experiment and trial ids, paths, ...).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the simulation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SimError {
    /// Invalid plugin ids, malformed node commands or attribute values.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Graph plugin construction or initialisation failures.
    #[error("graph error: {0}")]
    Graph(ErrorInfo),
    /// Model plugin construction or initialisation failures.
    #[error("model error: {0}")]
    Model(ErrorInfo),
    /// Filesystem failures while creating or flushing trial outputs.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Operation refused in the current experiment status.
    #[error("state error: {0}")]
    State(ErrorInfo),
    /// Output sink registration and removal errors.
    #[error("output error: {0}")]
    Output(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SimError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SimError::Config(info)
            | SimError::Graph(info)
            | SimError::Model(info)
            | SimError::Io(info)
            | SimError::State(info)
            | SimError::Output(info) => info,
        }
    }

    /// Stable error code of the payload.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// Rewrites the payload, keeping the variant.
    pub fn map_info(self, f: impl FnOnce(ErrorInfo) -> ErrorInfo) -> Self {
        match self {
            SimError::Config(info) => SimError::Config(f(info)),
            SimError::Graph(info) => SimError::Graph(f(info)),
            SimError::Model(info) => SimError::Model(f(info)),
            SimError::Io(info) => SimError::Io(f(info)),
            SimError::State(info) => SimError::State(f(info)),
            SimError::Output(info) => SimError::Output(f(info)),
        }
    }

    /// Wraps a filesystem error, keeping the offending path as context.
    pub fn io(code: &str, path: impl Display, err: impl ToString) -> Self {
        SimError::Io(
            ErrorInfo::new(code, err.to_string()).with_context("path", path.to_string()),
        )
    }
}
