use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::{Graph, OpKind, Shape};

/// Oldest operator set that defines every operator the builder emits with
/// the semantics it relies on.
pub const MIN_OPSET: i64 = 7;
pub const MAX_OPSET: i64 = 21;

/// Lowest IR version that may carry operator set `opset`.
pub fn default_ir_version(opset: i64) -> i64 {
    match opset {
        ..=10 => 5,
        11 => 6,
        12..=13 => 7,
        14..=18 => 8,
        19..=20 => 9,
        _ => 10,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    UnresolvedInput,
    DuplicateName,
    Arity,
    InitializerSize,
    ShapeMismatch,
    InputReference,
    OutputReference,
    Metadata,
    UnsupportedOperator,
    TensorType,
}

impl ValidationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnresolvedInput => "unresolved input",
            Self::DuplicateName => "duplicate name",
            Self::Arity => "arity",
            Self::InitializerSize => "initializer size",
            Self::ShapeMismatch => "shape mismatch",
            Self::InputReference => "graph input reference",
            Self::OutputReference => "graph output reference",
            Self::Metadata => "metadata",
            Self::UnsupportedOperator => "unsupported operator",
            Self::TensorType => "tensor type",
        }
    }
}

impl std::fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub detail: String,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

type Check = std::result::Result<(), ValidationError>;

/// A graph plus the format metadata it is written with.
///
/// Fields are private: a model does not change after [`Model::assemble`].
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    graph: Graph,
    opset_version: i64,
    format_revision: i64,
}

impl Model {
    /// Wraps `graph`. Never fails; see [`Model::validate`].
    pub fn assemble(graph: Graph, opset_version: i64, format_revision: i64) -> Self {
        Self {
            graph,
            opset_version,
            format_revision,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn opset_version(&self) -> i64 {
        self.opset_version
    }

    /// IR version of the container format.
    pub fn format_revision(&self) -> i64 {
        self.format_revision
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// Structural checks, stopping at the first violation:
    /// references, initializer sizes, the shape chain, graph IO usage, then
    /// format metadata.
    pub fn validate(&self) -> Check {
        check_references(&self.graph)?;
        check_initializers(&self.graph)?;
        check_shapes(&self.graph)?;
        check_io(&self.graph)?;
        check_metadata(self.opset_version, self.format_revision)
    }
}

pub fn assemble(graph: Graph, opset_version: i64, format_revision: i64) -> Model {
    Model::assemble(graph, opset_version, format_revision)
}

pub fn validate(model: &Model) -> Check {
    model.validate()
}

fn check_references(graph: &Graph) -> Check {
    let mut known: HashSet<&str> = HashSet::new();
    known.insert(&graph.input.name);
    for init in &graph.initializers {
        if !known.insert(&init.name) {
            return Err(ValidationError::new(
                ValidationErrorKind::DuplicateName,
                format!("initializer `{}` is declared twice or shadows the graph input", init.name),
            ));
        }
    }

    for (idx, node) in graph.nodes.iter().enumerate() {
        if node.inputs.len() != node.op.arity() || node.outputs.len() != 1 {
            return Err(ValidationError::new(
                ValidationErrorKind::Arity,
                format!(
                    "node `{}` (#{idx}, {}) has {} inputs and {} outputs, expected {} and 1",
                    node.name,
                    node.op.op_type(),
                    node.inputs.len(),
                    node.outputs.len(),
                    node.op.arity()
                ),
            ));
        }
        for input in &node.inputs {
            if !known.contains(input.as_str()) {
                return Err(ValidationError::new(
                    ValidationErrorKind::UnresolvedInput,
                    format!(
                        "node `{}` (#{idx}) reads `{input}`, which is not produced by an earlier node, an initializer, or the graph input",
                        node.name
                    ),
                ));
            }
        }
        for output in &node.outputs {
            if !known.insert(output) {
                return Err(ValidationError::new(
                    ValidationErrorKind::DuplicateName,
                    format!("node `{}` (#{idx}) reassigns tensor `{output}`", node.name),
                ));
            }
        }
    }
    Ok(())
}

fn check_initializers(graph: &Graph) -> Check {
    for init in &graph.initializers {
        if init.data.is_none() {
            return Err(ValidationError::new(
                ValidationErrorKind::InitializerSize,
                format!("initializer `{}` carries no data", init.name),
            ));
        }
        if init.shape.dims().contains(&0) {
            return Err(ValidationError::new(
                ValidationErrorKind::ShapeMismatch,
                format!("initializer `{}` has a zero dimension {}", init.name, init.shape),
            ));
        }
        if init.byte_len() != init.expected_byte_len() {
            return Err(ValidationError::new(
                ValidationErrorKind::InitializerSize,
                format!(
                    "initializer `{}` holds {} bytes but shape {} needs {}",
                    init.name,
                    init.byte_len(),
                    init.shape,
                    init.expected_byte_len()
                ),
            ));
        }
    }
    Ok(())
}

fn check_shapes(graph: &Graph) -> Check {
    let mut shapes: HashMap<&str, Shape> = HashMap::new();
    shapes.insert(&graph.input.name, graph.input.shape.clone());
    for init in &graph.initializers {
        shapes.insert(&init.name, init.shape.clone());
    }

    for node in &graph.nodes {
        let lookup = |name: &str| {
            shapes.get(name).cloned().ok_or_else(|| {
                ValidationError::new(
                    ValidationErrorKind::UnresolvedInput,
                    format!("node `{}` reads `{name}` before it has a shape", node.name),
                )
            })
        };
        let mismatch = |detail: String| {
            ValidationError::new(
                ValidationErrorKind::ShapeMismatch,
                format!("node `{}`: {detail}", node.name),
            )
        };

        let a_name = node.inputs[0].as_str();
        let a = lookup(a_name)?;
        let out = match node.op {
            OpKind::MatMul => {
                let b_name = node.inputs[1].as_str();
                let b = lookup(b_name)?;
                match (a.last(), b.dims()) {
                    (Some(k), [rows, cols]) if k == *rows => {
                        let mut dims = a.dims().to_vec();
                        if let Some(last) = dims.last_mut() {
                            *last = *cols;
                        }
                        Shape::from_slice(&dims)
                    }
                    _ => {
                        return Err(mismatch(format!(
                            "cannot multiply `{a_name}` {a} by `{b_name}` {b}"
                        )))
                    }
                }
            }
            OpKind::Add => {
                let b_name = node.inputs[1].as_str();
                let b = lookup(b_name)?;
                let broadcasts = b == a || (b.rank() == 1 && b.last() == a.last());
                if !broadcasts {
                    return Err(mismatch(format!(
                        "cannot add `{b_name}` {b} to `{a_name}` {a}"
                    )));
                }
                a
            }
            OpKind::Relu | OpKind::Sigmoid => a,
        };

        shapes.insert(&node.outputs[0], out);
    }

    match shapes.get(graph.output.name.as_str()) {
        Some(shape) if *shape == graph.output.shape => Ok(()),
        Some(shape) => Err(ValidationError::new(
            ValidationErrorKind::ShapeMismatch,
            format!(
                "graph output `{}` is declared {} but computes {shape}",
                graph.output.name, graph.output.shape
            ),
        )),
        None => Err(ValidationError::new(
            ValidationErrorKind::OutputReference,
            format!("graph output `{}` is never produced", graph.output.name),
        )),
    }
}

fn check_io(graph: &Graph) -> Check {
    let consumers = graph
        .nodes
        .iter()
        .flat_map(|n| n.inputs.iter())
        .filter(|name| **name == graph.input.name)
        .count();
    if consumers != 1 {
        return Err(ValidationError::new(
            ValidationErrorKind::InputReference,
            format!(
                "graph input `{}` is read {consumers} times, expected once",
                graph.input.name
            ),
        ));
    }

    let producers = graph
        .nodes
        .iter()
        .flat_map(|n| n.outputs.iter())
        .filter(|name| **name == graph.output.name)
        .count();
    let last_output = graph.nodes.last().and_then(|n| n.output());
    if producers != 1 || last_output != Some(graph.output.name.as_str()) {
        return Err(ValidationError::new(
            ValidationErrorKind::OutputReference,
            format!(
                "graph output `{}` must be produced once, by the final node (found {producers} producers, final node writes {:?})",
                graph.output.name, last_output
            ),
        ));
    }
    Ok(())
}

fn check_metadata(opset_version: i64, format_revision: i64) -> Check {
    if !(MIN_OPSET..=MAX_OPSET).contains(&opset_version) {
        return Err(ValidationError::new(
            ValidationErrorKind::Metadata,
            format!("operator set {opset_version} is outside {MIN_OPSET}..={MAX_OPSET}"),
        ));
    }
    let min_ir = default_ir_version(opset_version);
    if format_revision < min_ir {
        return Err(ValidationError::new(
            ValidationErrorKind::Metadata,
            format!(
                "IR version {format_revision} cannot carry operator set {opset_version} (needs {min_ir} or later)"
            ),
        ));
    }
    Ok(())
}
