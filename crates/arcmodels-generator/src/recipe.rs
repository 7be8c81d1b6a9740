use arcmodels_core::{
    default_ir_version, Activation, ModelConfig, SeedPolicy, WeightInit, DEFAULT_INPUT_NAME,
    DEFAULT_OUTPUT_NAME,
};

pub const DEFAULT_HIDDEN: usize = 16;
pub const DECISION_OPSET: i64 = 17;
pub const SPENDING_OPSET: i64 = 11;
pub const SPENDING_SEED: u64 = 42;

/// How a catalog entry becomes a model: layer widths after the input,
/// activations, weight scheme, seed source and format metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Recipe {
    pub layers: Vec<usize>,
    pub activations: Vec<Activation>,
    pub weight_init: WeightInit,
    pub seed: SeedPolicy,
    pub opset_version: i64,
    /// Pinned IR version; `None` uses the lowest one the opset allows.
    pub format_revision: Option<i64>,
    /// Graph name; `None` uses the model name.
    pub graph_name: Option<String>,
    pub input_name: String,
    pub output_name: String,
}

impl Recipe {
    /// Score model: `input -> hidden -> hidden/2 -> 1`, sigmoid output,
    /// Xavier weights seeded from the model name.
    pub fn decision(hidden: usize) -> Self {
        Self {
            layers: vec![hidden, hidden / 2, 1],
            activations: vec![Activation::Relu, Activation::Relu, Activation::Sigmoid],
            weight_init: WeightInit::XavierUniform,
            seed: SeedPolicy::NameHash,
            opset_version: DECISION_OPSET,
            format_revision: None,
            graph_name: None,
            input_name: DEFAULT_INPUT_NAME.to_string(),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
        }
    }

    /// Spending model: `8 -> 16 -> 8 -> 3` with raw outputs
    /// (shouldBuy, confidence, riskScore), normal x0.1 weights from seed 42.
    pub fn spending() -> Self {
        Self {
            layers: vec![16, 8, 3],
            activations: vec![Activation::Relu, Activation::Relu, Activation::None],
            weight_init: WeightInit::SMALL_NORMAL,
            seed: SeedPolicy::Fixed(SPENDING_SEED),
            opset_version: SPENDING_OPSET,
            format_revision: Some(6),
            graph_name: Some("SpendingModel".to_string()),
            input_name: DEFAULT_INPUT_NAME.to_string(),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
        }
    }

    pub fn format_revision(&self) -> i64 {
        self.format_revision
            .unwrap_or_else(|| default_ir_version(self.opset_version))
    }

    pub fn graph_name(&self, config: &ModelConfig) -> String {
        self.graph_name.clone().unwrap_or_else(|| config.name.clone())
    }
}

impl Default for Recipe {
    fn default() -> Self {
        Self::decision(DEFAULT_HIDDEN)
    }
}

pub fn spending_config() -> ModelConfig {
    ModelConfig::new(
        "spending-model",
        8,
        "zkML-proven spending decision (shouldBuy, confidence, riskScore)",
    )
}
