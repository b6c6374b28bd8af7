#![deny(missing_docs)]
//! Agent records, node-set construction and the graph plugin contract.

mod cmd;
mod graph;
mod graph_type;
mod node;

pub use graph::{Edge, EdgeList, Graph};
pub use graph_type::GraphType;
pub use node::{Node, NodeSet};
