use std::collections::BTreeSet;

use agentnet_core::errors::{ErrorInfo, SimError};
use agentnet_core::{Attributes, Prg};

use crate::graph_type::GraphType;
use crate::node::NodeSet;

/// Connection between two agents.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Dense identifier, equal to the edge's position in its [`EdgeList`].
    pub id: usize,
    /// Origin node identifier.
    pub origin: usize,
    /// Neighbour node identifier.
    pub neighbour: usize,
    /// Edge state observed by outputs.
    pub attrs: Attributes,
}

/// Edge storage with adjacency lookups, shared by graph plugin implementations.
#[derive(Debug, Clone)]
pub struct EdgeList {
    graph_type: GraphType,
    edges: Vec<Edge>,
    adjacency: Vec<Vec<usize>>,
    signatures: BTreeSet<(usize, usize)>,
}

impl EdgeList {
    /// Creates an empty edge list for `node_count` nodes.
    pub fn new(graph_type: GraphType, node_count: usize) -> Self {
        Self {
            graph_type,
            edges: Vec::new(),
            adjacency: vec![Vec::new(); node_count],
            signatures: BTreeSet::new(),
        }
    }

    /// Adds an edge; rejects self loops, unknown nodes and duplicates.
    pub fn add_edge(
        &mut self,
        origin: usize,
        neighbour: usize,
        attrs: Attributes,
    ) -> Result<usize, SimError> {
        let node_count = self.adjacency.len();
        if origin >= node_count || neighbour >= node_count {
            return Err(SimError::Graph(
                ErrorInfo::new("unknown-node", "edge endpoint does not exist")
                    .with_context("origin", origin.to_string())
                    .with_context("neighbour", neighbour.to_string()),
            ));
        }
        if origin == neighbour {
            return Err(SimError::Graph(
                ErrorInfo::new("self-loop", "edge endpoints must differ")
                    .with_context("node", origin.to_string()),
            ));
        }
        let signature = self.signature(origin, neighbour);
        if !self.signatures.insert(signature) {
            return Err(SimError::Graph(
                ErrorInfo::new("duplicate-edge", "edge already exists")
                    .with_context("origin", origin.to_string())
                    .with_context("neighbour", neighbour.to_string()),
            ));
        }
        let id = self.edges.len();
        self.edges.push(Edge {
            id,
            origin,
            neighbour,
            attrs,
        });
        self.adjacency[origin].push(neighbour);
        if !self.graph_type.is_directed() {
            self.adjacency[neighbour].push(origin);
        }
        Ok(id)
    }

    fn signature(&self, origin: usize, neighbour: usize) -> (usize, usize) {
        if self.graph_type.is_directed() {
            (origin, neighbour)
        } else {
            (origin.min(neighbour), origin.max(neighbour))
        }
    }

    /// Neighbours reachable from `node`.
    pub fn neighbours(&self, node: usize) -> &[usize] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All edges in identifier order.
    pub fn as_slice(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns true when no edge exists.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Drops every edge.
    pub fn clear(&mut self) {
        self.edges.clear();
        self.signatures.clear();
        for list in &mut self.adjacency {
            list.clear();
        }
    }
}

/// Capability contract of a graph-topology plugin.
///
/// A fresh instance is created for every trial. `setup` receives the trial's
/// agent population and parameters, `init` builds the topology. Both may use
/// the trial's generator; any error aborts the trial's construction.
pub trait Graph: Send {
    /// Stores the parameters and the agent population of the trial.
    fn setup(
        &mut self,
        prg: &mut Prg,
        params: &Attributes,
        nodes: NodeSet,
        graph_type: GraphType,
    ) -> Result<(), SimError>;

    /// Builds the topology.
    fn init(&mut self, prg: &mut Prg) -> Result<(), SimError>;

    /// Restores the freshly initialised state. Default: nothing to do.
    fn reset(&mut self) {}

    /// Graph type the instance was set up with.
    fn graph_type(&self) -> GraphType;

    /// Agent population.
    fn nodes(&self) -> &NodeSet;

    /// Mutable agent population, for models updating agent state.
    fn nodes_mut(&mut self) -> &mut NodeSet;

    /// Current edges.
    fn edges(&self) -> &[Edge];

    /// Neighbours of `node`. Default: scans [`Graph::edges`].
    fn neighbours(&self, node: usize) -> Vec<usize> {
        let directed = self.graph_type().is_directed();
        self.edges()
            .iter()
            .filter_map(|edge| {
                if edge.origin == node {
                    Some(edge.neighbour)
                } else if !directed && edge.neighbour == node {
                    Some(edge.origin)
                } else {
                    None
                }
            })
            .collect()
    }
}
