use agentnet_core::Attributes;
use agentnet_graph::{EdgeList, GraphType};

#[test]
fn undirected_edges_are_symmetric() {
    let mut edges = EdgeList::new(GraphType::Undirected, 3);
    edges.add_edge(0, 1, Attributes::new()).unwrap();
    edges.add_edge(2, 1, Attributes::new()).unwrap();
    assert_eq!(edges.neighbours(1), &[0, 2]);
    assert_eq!(edges.neighbours(0), &[1]);

    let err = edges.add_edge(1, 0, Attributes::new()).unwrap_err();
    assert_eq!(err.code(), "duplicate-edge");
}

#[test]
fn directed_edges_keep_orientation() {
    let mut edges = EdgeList::new(GraphType::Directed, 2);
    edges.add_edge(0, 1, Attributes::new()).unwrap();
    edges.add_edge(1, 0, Attributes::new()).unwrap();
    assert_eq!(edges.len(), 2);
    assert_eq!(edges.neighbours(0), &[1]);
    assert_eq!(edges.as_slice()[1].origin, 1);
}

#[test]
fn invalid_endpoints_are_rejected() {
    let mut edges = EdgeList::new(GraphType::Undirected, 2);
    assert_eq!(edges.add_edge(0, 0, Attributes::new()).unwrap_err().code(), "self-loop");
    assert_eq!(edges.add_edge(0, 5, Attributes::new()).unwrap_err().code(), "unknown-node");
    assert!(edges.is_empty());
    assert!(edges.neighbours(9).is_empty());
}

#[test]
fn clear_drops_edges_and_signatures() {
    let mut edges = EdgeList::new(GraphType::Undirected, 2);
    edges.add_edge(0, 1, Attributes::new()).unwrap();
    edges.clear();
    assert!(edges.is_empty());
    assert!(edges.add_edge(0, 1, Attributes::new()).is_ok());
}

#[test]
fn graph_type_names() {
    assert_eq!(GraphType::from_name("directed"), GraphType::Directed);
    assert_eq!(GraphType::from_name(" undirected "), GraphType::Undirected);
    assert_eq!(GraphType::from_name("grid"), GraphType::Invalid);
    assert_eq!(GraphType::Directed.to_string(), "directed");
}
