use agentnet_core::Attributes;

use crate::graph_type::GraphType;

/// A single agent record.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Dense identifier, equal to the node's position in its [`NodeSet`].
    pub id: usize,
    /// Agent state observed by outputs and mutated by models.
    pub attrs: Attributes,
    /// Horizontal position hint for layouts.
    pub x: f64,
    /// Vertical position hint for layouts.
    pub y: f64,
}

impl Node {
    /// Creates a node without position hints.
    pub fn new(id: usize, attrs: Attributes) -> Self {
        Self {
            id,
            attrs,
            x: 0.0,
            y: 0.0,
        }
    }
}

/// Initial agent population of a trial.
///
/// A node set only carries agent records; the topology is rebuilt by the
/// graph plugin of every trial. Copies go through [`NodeSet::branch`].
#[derive(Debug, PartialEq)]
pub struct NodeSet {
    graph_type: GraphType,
    nodes: Vec<Node>,
}

impl NodeSet {
    /// Wraps `nodes`, renumbering them densely in order.
    pub fn new(graph_type: GraphType, mut nodes: Vec<Node>) -> Self {
        for (idx, node) in nodes.iter_mut().enumerate() {
            node.id = idx;
        }
        Self { graph_type, nodes }
    }

    /// Graph type the set was built for.
    pub fn graph_type(&self) -> GraphType {
        self.graph_type
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when the set holds no agent.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Agent with identifier `id`.
    pub fn get(&self, id: usize) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable agent with identifier `id`.
    pub fn get_mut(&mut self, id: usize) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Agents in identifier order.
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Mutable agents in identifier order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Node> {
        self.nodes.iter_mut()
    }

    /// Deep copy of the agent attribute values.
    pub fn branch(&self) -> NodeSet {
        NodeSet {
            graph_type: self.graph_type,
            nodes: self.nodes.clone(),
        }
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
