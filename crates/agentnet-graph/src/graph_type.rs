use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Orientation of the edges built by a graph plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    /// Unrecognised graph type; node sets cannot be built for it.
    #[default]
    Invalid,
    /// Edges connect both endpoints symmetrically.
    Undirected,
    /// Edges point from origin to neighbour.
    Directed,
}

impl GraphType {
    /// Lenient conversion; unknown strings map to [`GraphType::Invalid`].
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or(GraphType::Invalid)
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphType::Invalid => "invalid",
            GraphType::Undirected => "undirected",
            GraphType::Directed => "directed",
        }
    }

    /// True for [`GraphType::Directed`].
    pub fn is_directed(&self) -> bool {
        matches!(self, GraphType::Directed)
    }
}

impl FromStr for GraphType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "undirected" => Ok(GraphType::Undirected),
            "directed" => Ok(GraphType::Directed),
            _ => Err(()),
        }
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
