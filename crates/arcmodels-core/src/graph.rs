//! Dense feed-forward graphs.
//!
//! A layer `i` (1-based) with input width `w_in` and output width `w_out`
//! lowers to
//!
//! ```text
//! fc{i}_matmul: MatMul(prev, fc{i}_weight[w_in, w_out]) -> fc{i}_mm
//! fc{i}_add:    Add(fc{i}_mm, fc{i}_bias[w_out])        -> fc{i}_out
//! fc{i}_relu:   Relu(fc{i}_out)                          -> fc{i}_relu     (optional)
//! ```
//!
//! and the last tensor of the last layer is renamed to the graph output.
//! Nodes are pushed in that order and never reordered, so the node list is a
//! topological order of the graph.

use tracing::debug;

use crate::{Error, Result, Shape, Tensor, TensorInitializer, MAX_TENSOR_ELEMENTS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    MatMul,
    Add,
    Relu,
    Sigmoid,
}

impl OpKind {
    /// ONNX operator name.
    pub fn op_type(&self) -> &'static str {
        match self {
            OpKind::MatMul => "MatMul",
            OpKind::Add => "Add",
            OpKind::Relu => "Relu",
            OpKind::Sigmoid => "Sigmoid",
        }
    }

    pub fn from_op_type(op_type: &str) -> Option<Self> {
        match op_type {
            "MatMul" => Some(OpKind::MatMul),
            "Add" => Some(OpKind::Add),
            "Relu" => Some(OpKind::Relu),
            "Sigmoid" => Some(OpKind::Sigmoid),
            _ => None,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            OpKind::MatMul | OpKind::Add => 2,
            OpKind::Relu | OpKind::Sigmoid => 1,
        }
    }
}

/// Element-wise activation applied at a layer boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Activation {
    #[default]
    None,
    Relu,
    Sigmoid,
}

impl Activation {
    pub fn op(&self) -> Option<OpKind> {
        match self {
            Activation::None => None,
            Activation::Relu => Some(OpKind::Relu),
            Activation::Sigmoid => Some(OpKind::Sigmoid),
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Activation::None => "out",
            Activation::Relu => "relu",
            Activation::Sigmoid => "sigmoid",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub op: OpKind,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl Node {
    pub fn new(name: impl Into<String>, op: OpKind, inputs: &[&str], output: &str) -> Self {
        Self {
            name: name.into(),
            op,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: vec![output.to_string()],
        }
    }

    pub fn output(&self) -> Option<&str> {
        self.outputs.first().map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Graph {
    pub name: String,
    pub input: Tensor,
    pub output: Tensor,
    pub nodes: Vec<Node>,
    pub initializers: Vec<Tensor>,
}

impl Graph {
    pub fn initializer(&self, name: &str) -> Option<&Tensor> {
        self.initializers.iter().find(|t| t.name == name)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn parameter_count(&self) -> usize {
        self.initializers.iter().map(Tensor::numel).sum()
    }

    /// `(w_in, w_out)` of every MatMul weight, in layer order.
    pub fn layer_shapes(&self) -> Vec<(usize, usize)> {
        self.nodes
            .iter()
            .filter(|n| n.op == OpKind::MatMul)
            .filter_map(|n| n.inputs.get(1).and_then(|w| self.initializer(w)))
            .filter_map(|w| match w.shape.dims() {
                [w_in, w_out] => Some((*w_in, *w_out)),
                _ => None,
            })
            .collect()
    }
}

pub const DEFAULT_INPUT_NAME: &str = "input";
pub const DEFAULT_OUTPUT_NAME: &str = "output";

/// Builds layered dense graphs with configurable naming.
#[derive(Clone, Debug)]
pub struct GraphBuilder {
    name: String,
    input_name: String,
    output_name: String,
    batch: usize,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new("DenseModel")
    }
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_name: DEFAULT_INPUT_NAME.to_string(),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            batch: 1,
        }
    }

    pub fn with_io_names(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.input_name = input.into();
        self.output_name = output.into();
        self
    }

    pub fn build(
        &self,
        input_dim: usize,
        layer_dims: &[usize],
        activations: &[Activation],
        init: &mut TensorInitializer,
    ) -> Result<Graph> {
        check_layers(input_dim, layer_dims, activations)?;
        if self.input_name == self.output_name {
            return Err(Error::Shape(format!(
                "graph input and output share the name `{}`",
                self.input_name
            )));
        }

        let mut nodes = Vec::with_capacity(layer_dims.len() * 3);
        let mut initializers = Vec::with_capacity(layer_dims.len() * 2);
        let mut prev = self.input_name.clone();
        let mut w_in = input_dim;

        for (i, (&w_out, &activation)) in layer_dims.iter().zip(activations).enumerate() {
            let prefix = format!("fc{}", i + 1);
            let last = i + 1 == layer_dims.len();

            let weight = init.weight(&format!("{prefix}_weight"), &[w_in, w_out])?;
            let bias = init.bias(&format!("{prefix}_bias"), w_out)?;

            let mm = format!("{prefix}_mm");
            let sum = match (last, activation) {
                (true, Activation::None) => self.output_name.clone(),
                _ => format!("{prefix}_out"),
            };

            nodes.push(Node::new(
                format!("{prefix}_matmul"),
                OpKind::MatMul,
                &[prev.as_str(), weight.name.as_str()],
                &mm,
            ));
            nodes.push(Node::new(
                format!("{prefix}_add"),
                OpKind::Add,
                &[mm.as_str(), bias.name.as_str()],
                &sum,
            ));

            prev = match activation.op() {
                Some(op) => {
                    let out = if last {
                        self.output_name.clone()
                    } else {
                        format!("{prefix}_{}", activation.suffix())
                    };
                    nodes.push(Node::new(
                        format!("{prefix}_{}", activation.suffix()),
                        op,
                        &[sum.as_str()],
                        &out,
                    ));
                    out
                }
                None => sum,
            };

            debug!(layer = %prefix, w_in, w_out, ?activation, "emitted dense layer");
            initializers.push(weight);
            initializers.push(bias);
            w_in = w_out;
        }

        Ok(Graph {
            name: self.name.clone(),
            input: Tensor::descriptor(
                self.input_name.clone(),
                Shape::from_slice(&[self.batch, input_dim]),
            ),
            output: Tensor::descriptor(
                self.output_name.clone(),
                Shape::from_slice(&[self.batch, w_in]),
            ),
            nodes,
            initializers,
        })
    }
}

/// Builds a dense graph named `DenseModel` with `input`/`output` IO names.
pub fn build_layered_graph(
    input_dim: usize,
    layer_dims: &[usize],
    activations: &[Activation],
    init: &mut TensorInitializer,
) -> Result<Graph> {
    GraphBuilder::default().build(input_dim, layer_dims, activations, init)
}

fn check_layers(input_dim: usize, layer_dims: &[usize], activations: &[Activation]) -> Result<()> {
    if layer_dims.is_empty() {
        return Err(Error::Shape(
            "a graph needs at least one dense layer".to_string(),
        ));
    }
    if activations.len() != layer_dims.len() {
        return Err(Error::Shape(format!(
            "{} layers but {} activations",
            layer_dims.len(),
            activations.len()
        )));
    }
    if input_dim == 0 {
        return Err(Error::Shape("input dimension must be positive".to_string()));
    }
    if let Some(i) = layer_dims.iter().position(|d| *d == 0) {
        return Err(Error::Shape(format!(
            "layer {} has non-positive width",
            i + 1
        )));
    }
    let mut w_in = input_dim;
    for (i, &w_out) in layer_dims.iter().enumerate() {
        let fits = w_in
            .checked_mul(w_out)
            .is_some_and(|n| n <= MAX_TENSOR_ELEMENTS);
        if !fits {
            return Err(Error::Shape(format!(
                "layer {} weight [{w_in}, {w_out}] exceeds {MAX_TENSOR_ELEMENTS} elements",
                i + 1
            )));
        }
        w_in = w_out;
    }
    Ok(())
}
