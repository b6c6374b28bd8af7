#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use agentnet_core::errors::{ErrorInfo, SimError};
use agentnet_core::{AttributeRange, Attributes, AttributesScope, Prg, Value};
use agentnet_exp::{
    EntityScope, ExpConfig, FileOutputs, GraphPlugin, Model, ModelPlugin, OutputFn, OutputSpec,
    PluginRegistry, Settings, SimContext,
};
use agentnet_graph::{Edge, EdgeList, Graph, GraphType, NodeSet};

/// Ring lattice: node `i` linked to `i + 1`.
pub struct RingGraph {
    graph_type: GraphType,
    nodes: NodeSet,
    edges: EdgeList,
}

impl RingGraph {
    pub fn new() -> Self {
        Self {
            graph_type: GraphType::Invalid,
            nodes: NodeSet::new(GraphType::Invalid, Vec::new()),
            edges: EdgeList::new(GraphType::Invalid, 0),
        }
    }
}

impl Graph for RingGraph {
    fn setup(
        &mut self,
        _prg: &mut Prg,
        _params: &Attributes,
        nodes: NodeSet,
        graph_type: GraphType,
    ) -> Result<(), SimError> {
        self.graph_type = graph_type;
        self.edges = EdgeList::new(graph_type, nodes.len());
        self.nodes = nodes;
        Ok(())
    }

    fn init(&mut self, _prg: &mut Prg) -> Result<(), SimError> {
        let n = self.nodes.len();
        if n < 2 {
            return Ok(());
        }
        let links = if n == 2 { 1 } else { n };
        for origin in 0..links {
            self.edges
                .add_edge(origin, (origin + 1) % n, Attributes::new().with("weight", 1.0))?;
        }
        Ok(())
    }

    fn graph_type(&self) -> GraphType {
        self.graph_type
    }

    fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    fn nodes_mut(&mut self) -> &mut NodeSet {
        &mut self.nodes
    }

    fn edges(&self) -> &[Edge] {
        self.edges.as_slice()
    }

    fn neighbours(&self, node: usize) -> Vec<usize> {
        self.edges.neighbours(node).to_vec()
    }
}

/// Graph whose topology can never be built.
pub struct BrokenGraph(RingGraph);

impl Graph for BrokenGraph {
    fn setup(
        &mut self,
        prg: &mut Prg,
        params: &Attributes,
        nodes: NodeSet,
        graph_type: GraphType,
    ) -> Result<(), SimError> {
        self.0.setup(prg, params, nodes, graph_type)
    }

    fn init(&mut self, _prg: &mut Prg) -> Result<(), SimError> {
        Err(SimError::Graph(ErrorInfo::new(
            "broken-topology",
            "topology cannot be built",
        )))
    }

    fn graph_type(&self) -> GraphType {
        self.0.graph_type()
    }

    fn nodes(&self) -> &NodeSet {
        self.0.nodes()
    }

    fn nodes_mut(&mut self) -> &mut NodeSet {
        self.0.nodes_mut()
    }

    fn edges(&self) -> &[Edge] {
        self.0.edges()
    }
}

/// Voter dynamics: a random agent copies the opinion of a random neighbour.
///
/// `converge_at > 0` reports convergence at that step; `fail_seed >= 0`
/// makes setup fail for the trial seeded with that value.
#[derive(Default)]
pub struct VoterModel {
    graph: Option<Box<dyn Graph>>,
    steps: i64,
    converge_at: i64,
}

impl Model for VoterModel {
    fn setup(
        &mut self,
        prg: &mut Prg,
        params: &Attributes,
        graph: Box<dyn Graph>,
    ) -> Result<(), SimError> {
        let fail_seed = params.get("fail_seed").and_then(Value::to_i64).unwrap_or(-1);
        if fail_seed >= 0 && prg.seed() == fail_seed as u64 {
            return Err(SimError::Model(
                ErrorInfo::new("voter-setup", "refusing this seed")
                    .with_context("seed", prg.seed().to_string()),
            ));
        }
        self.converge_at = params.get("converge_at").and_then(Value::to_i64).unwrap_or(0);
        self.graph = Some(graph);
        Ok(())
    }

    fn init(&mut self, _prg: &mut Prg) -> Result<(), SimError> {
        self.steps = 0;
        Ok(())
    }

    fn algorithm_step(&mut self, prg: &mut Prg) -> bool {
        self.steps += 1;
        if let Some(graph) = self.graph.as_mut() {
            let n = graph.nodes().len();
            if n > 0 {
                let node = prg.index(n);
                let neighbours = graph.neighbours(node);
                if !neighbours.is_empty() {
                    let pick = neighbours[prg.index(neighbours.len())];
                    let opinion = graph
                        .nodes()
                        .get(pick)
                        .and_then(|nb| nb.attrs.get("opinion"))
                        .cloned()
                        .unwrap_or_default();
                    if let Some(target) = graph.nodes_mut().get_mut(node) {
                        target.attrs.set("opinion", opinion);
                    }
                }
            }
        }
        self.converge_at > 0 && self.steps >= self.converge_at
    }

    fn graph(&self) -> Option<&dyn Graph> {
        self.graph.as_deref()
    }

    fn graph_mut(&mut self) -> Option<&mut dyn Graph> {
        match self.graph.as_mut() {
            Some(graph) => Some(&mut **graph),
            None => None,
        }
    }

    fn custom_output(&self, name: &str) -> Option<Value> {
        match name {
            "steps" => Some(Value::Int(self.steps)),
            _ => None,
        }
    }
}

pub fn registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry
        .register_graph(GraphPlugin::new(
            "ring",
            AttributesScope::default(),
            || Some(Box::new(RingGraph::new()) as Box<dyn Graph>),
        ))
        .expect("ring");
    registry
        .register_graph(GraphPlugin::new(
            "broken",
            AttributesScope::default(),
            || Some(Box::new(BrokenGraph(RingGraph::new())) as Box<dyn Graph>),
        ))
        .expect("broken");
    registry
        .register_model(ModelPlugin::new(
            "voter",
            AttributesScope::new(vec![AttributeRange::int("opinion", 0, 1)]).expect("scope"),
            AttributesScope::new(vec![
                AttributeRange::int("converge_at", 0, 1_000_000),
                AttributeRange::int("fail_seed", -1, i64::MAX),
            ])
            .expect("scope"),
            || Some(Box::<VoterModel>::default() as Box<dyn Model>),
        ))
        .expect("voter");
    registry
}

pub fn context() -> Arc<SimContext> {
    context_with(Settings {
        max_threads: 4,
        ..Settings::default()
    })
}

pub fn context_with(settings: Settings) -> Arc<SimContext> {
    Arc::new(SimContext::with_settings(registry(), settings))
}

pub fn config(trials: u32, stop_at: u32) -> ExpConfig {
    ExpConfig {
        id: 1,
        trials,
        stop_at,
        seed: 11,
        graph_id: "ring".into(),
        graph_type: "undirected".into(),
        model_id: "voter".into(),
        nodes: "*20;rand_7".into(),
        graph_params: Attributes::new(),
        model_params: Attributes::new().with("converge_at", 0).with("fail_seed", -1),
        autodelete: false,
        file_outputs: None,
    }
}

pub fn opinion_count() -> OutputSpec {
    OutputSpec::new(
        EntityScope::Nodes,
        "opinion",
        OutputFn::Count {
            values: vec![Value::Int(0), Value::Int(1)],
        },
    )
}

pub fn steps_output() -> OutputSpec {
    OutputSpec::new(EntityScope::Model, "steps", OutputFn::Raw)
}

pub fn with_files(mut config: ExpConfig, dir: &Path) -> ExpConfig {
    config.file_outputs = Some(FileOutputs {
        directory: dir.to_path_buf(),
        outputs: vec![steps_output(), opinion_count()],
    });
    config
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("read csv")
        .lines()
        .map(str::to_string)
        .collect()
}
