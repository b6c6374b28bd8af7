//! Node-set construction from a textual command.
//!
//! Three forms are accepted:
//!
//! * `*N;mode` builds `N` nodes and applies `mode` to every attribute,
//! * `#N;attr_mode;...` gives one mode per attribute, in scope order,
//! * anything else is read as the path of a CSV file with one node per row.
//!
//! A mode is `min`, `max`, `rand_SEED` or `value_X`.

use std::path::Path;

use agentnet_core::errors::{ErrorInfo, SimError};
use agentnet_core::{AttributeRange, Attributes, AttributesScope, Prg, Value};

use crate::graph_type::GraphType;
use crate::node::{Node, NodeSet};

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Min,
    Max,
    Rand(u64),
    Value(String),
}

impl NodeSet {
    /// Builds the initial agent population described by `cmd`.
    pub fn from_cmd(
        cmd: &str,
        scope: &AttributesScope,
        graph_type: GraphType,
    ) -> Result<NodeSet, SimError> {
        if graph_type == GraphType::Invalid {
            return Err(cmd_error("invalid-graph-type", "graph type is not valid", cmd));
        }
        let cmd = cmd.trim();
        let nodes = if let Some(rest) = cmd.strip_prefix('*') {
            from_uniform_cmd(rest, scope)?
        } else if let Some(rest) = cmd.strip_prefix('#') {
            from_per_attribute_cmd(rest, scope)?
        } else {
            from_csv(Path::new(cmd), scope)?
        };
        if nodes.is_empty() {
            return Err(cmd_error("empty-node-set", "command produced no nodes", cmd));
        }
        Ok(NodeSet::new(graph_type, nodes))
    }
}

fn from_uniform_cmd(rest: &str, scope: &AttributesScope) -> Result<Vec<Node>, SimError> {
    let tokens: Vec<&str> = rest.split(';').collect();
    let [count, mode] = tokens.as_slice() else {
        return Err(cmd_error(
            "malformed-node-cmd",
            "expected '*N;mode'",
            rest,
        ));
    };
    let count = parse_count(count)?;
    let mode = parse_mode(mode)?;
    let modes = vec![mode; scope.len()];
    generate(count, scope, &modes)
}

fn from_per_attribute_cmd(rest: &str, scope: &AttributesScope) -> Result<Vec<Node>, SimError> {
    let mut tokens = rest.split(';');
    let count = parse_count(tokens.next().unwrap_or_default())?;
    let tokens: Vec<&str> = tokens.collect();
    if tokens.len() != scope.len() {
        return Err(SimError::Config(
            ErrorInfo::new("malformed-node-cmd", "one mode is required per attribute")
                .with_context("expected", scope.len().to_string())
                .with_context("found", tokens.len().to_string()),
        ));
    }
    let mut modes = Vec::with_capacity(scope.len());
    for (range, token) in scope.iter().zip(tokens) {
        let mode = token
            .strip_prefix(range.name.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .ok_or_else(|| {
                SimError::Config(
                    ErrorInfo::new("malformed-node-cmd", "attribute out of order or unknown")
                        .with_context("expected", range.name.clone())
                        .with_context("token", token.to_string()),
                )
            })?;
        modes.push(parse_mode(mode)?);
    }
    generate(count, scope, &modes)
}

fn generate(count: usize, scope: &AttributesScope, modes: &[Mode]) -> Result<Vec<Node>, SimError> {
    // one generator per attribute so that each `rand_SEED` stream is independent
    let mut prgs: Vec<Option<Prg>> = modes
        .iter()
        .map(|mode| match mode {
            Mode::Rand(seed) => Some(Prg::from_seed(*seed)),
            _ => None,
        })
        .collect();
    let fixed: Vec<Option<Value>> = scope
        .iter()
        .zip(modes)
        .map(|(range, mode)| fixed_value(range, mode))
        .collect::<Result<_, _>>()?;

    let mut nodes = Vec::with_capacity(count);
    for id in 0..count {
        let mut attrs = Attributes::with_capacity(scope.len());
        for (idx, range) in scope.iter().enumerate() {
            let value = match (&fixed[idx], &mut prgs[idx]) {
                (Some(value), _) => value.clone(),
                (None, Some(prg)) => range.rand(prg),
                (None, None) => Value::Invalid,
            };
            attrs.set(range.name.clone(), value);
        }
        nodes.push(Node::new(id, attrs));
    }
    Ok(nodes)
}

fn fixed_value(range: &AttributeRange, mode: &Mode) -> Result<Option<Value>, SimError> {
    Ok(match mode {
        Mode::Min => Some(range.min()),
        Mode::Max => Some(range.max()),
        Mode::Value(text) => Some(range.validate(text)?),
        Mode::Rand(_) => None,
    })
}

fn parse_count(token: &str) -> Result<usize, SimError> {
    match token.trim().parse::<usize>() {
        Ok(count) if count > 0 => Ok(count),
        _ => Err(cmd_error(
            "invalid-node-count",
            "number of nodes must be a positive integer",
            token,
        )),
    }
}

fn parse_mode(token: &str) -> Result<Mode, SimError> {
    let token = token.trim();
    match token {
        "min" => return Ok(Mode::Min),
        "max" => return Ok(Mode::Max),
        _ => {}
    }
    if let Some(seed) = token.strip_prefix("rand_") {
        return seed
            .parse::<u64>()
            .map(Mode::Rand)
            .map_err(|_| cmd_error("invalid-node-mode", "random seed must be an integer", token));
    }
    if let Some(value) = token.strip_prefix("value_") {
        return Ok(Mode::Value(value.to_string()));
    }
    Err(cmd_error("invalid-node-mode", "unknown attribute mode", token))
}

fn from_csv(path: &Path, scope: &AttributesScope) -> Result<Vec<Node>, SimError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|err| SimError::io("node-file-open", path.display(), err))?;
    let headers = reader
        .headers()
        .map_err(|err| SimError::io("node-file-header", path.display(), err))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let mut columns = Vec::with_capacity(scope.len());
    for range in scope.iter() {
        let idx = column(&range.name).ok_or_else(|| {
            SimError::Config(
                ErrorInfo::new("node-file-missing-attribute", "node file lacks an attribute column")
                    .with_context("attribute", range.name.clone())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        columns.push(idx);
    }
    let x_col = column("x");
    let y_col = column("y");

    let mut nodes = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.map_err(|err| SimError::io("node-file-row", path.display(), err))?;
        let mut attrs = Attributes::with_capacity(scope.len());
        for (range, &col) in scope.iter().zip(&columns) {
            let value = range.validate(record.get(col).unwrap_or_default())?;
            attrs.set(range.name.clone(), value);
        }
        let mut node = Node::new(row_idx, attrs);
        node.x = coordinate(&record, x_col);
        node.y = coordinate(&record, y_col);
        nodes.push(node);
    }
    Ok(nodes)
}

fn coordinate(record: &csv::StringRecord, col: Option<usize>) -> f64 {
    col.and_then(|c| record.get(c))
        .and_then(|text| text.parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn cmd_error(code: &str, message: &str, token: &str) -> SimError {
    SimError::Config(ErrorInfo::new(code, message).with_context("cmd", token.to_string()))
}
