//! Deterministic tensor initialization.
//!
//! Every model owns one [`TensorInitializer`]. Its generator is seeded once
//! and threaded through all weight draws of that model in layer order, so
//! the values depend only on the seed and the sequence of shapes requested.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use tracing::trace;

use crate::{Error, Result, Shape, Tensor};

/// Weight sampling scheme. Biases are always zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WeightInit {
    /// `N(0, 1) * scale`
    Normal { scale: f32 },
    /// `U(-1, 1) * scale`
    Uniform { scale: f32 },
    /// `U(-a, a)` with `a = sqrt(6 / (fan_in + fan_out))`.
    XavierUniform,
}

impl WeightInit {
    pub const SMALL_NORMAL: WeightInit = WeightInit::Normal { scale: 0.1 };
}

/// Where a model's seed comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedPolicy {
    Fixed(u64),
    /// [`name_seed`] of the model name.
    NameHash,
}

impl SeedPolicy {
    pub fn resolve(&self, model_name: &str) -> u64 {
        match self {
            SeedPolicy::Fixed(seed) => *seed,
            SeedPolicy::NameHash => u64::from(name_seed(model_name)),
        }
    }
}

const FNV32_OFFSET: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over `bytes`.
///
/// Frozen: changing it changes the weights of every name-seeded model.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV32_OFFSET, |hash, b| {
        (hash ^ u32::from(*b)).wrapping_mul(FNV32_PRIME)
    })
}

/// Seed for a named model: FNV-1a of the UTF-8 name.
pub fn name_seed(name: &str) -> u32 {
    fnv1a_32(name.as_bytes())
}

pub struct TensorInitializer {
    seed: u64,
    scheme: WeightInit,
    rng: ChaCha8Rng,
}

impl TensorInitializer {
    pub fn new(seed: u64, scheme: WeightInit) -> Self {
        Self {
            seed,
            scheme,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn for_model(model_name: &str, policy: SeedPolicy, scheme: WeightInit) -> Self {
        Self::new(policy.resolve(model_name), scheme)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn scheme(&self) -> WeightInit {
        self.scheme
    }

    /// Draws the next weight tensor from the model's generator.
    pub fn weight(&mut self, name: &str, shape: &[usize]) -> Result<Tensor> {
        let shape = Shape::from_slice(shape);
        let n = shape.ensure_allocatable(&format!("weight `{name}`"))?;
        let values: Vec<f32> = match self.scheme {
            WeightInit::Normal { scale } => (0..n)
                .map(|_| self.rng.sample::<f32, _>(StandardNormal) * scale)
                .collect(),
            WeightInit::Uniform { scale } => (0..n)
                .map(|_| self.rng.random_range(-1.0f32..1.0) * scale)
                .collect(),
            WeightInit::XavierUniform => {
                let [fan_in, fan_out] = shape.dims() else {
                    return Err(Error::Shape(format!(
                        "xavier init needs a rank-2 weight, `{name}` has shape {shape}"
                    )));
                };
                let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
                (0..n)
                    .map(|_| self.rng.random_range(-limit..limit))
                    .collect()
            }
        };

        trace!(tensor = name, %shape, seed = self.seed, "initialized weight");
        Tensor::from_f32(name, shape, &values)
    }

    /// Zero bias of the given width. Does not advance the generator.
    pub fn bias(&mut self, name: &str, width: usize) -> Result<Tensor> {
        let shape = Shape::from_slice(&[width]);
        Tensor::zeros(name, shape)
    }
}

/// Stateless form: a fresh generator seeded with `seed` draws one tensor.
pub fn initialize(name: &str, shape: &[usize], seed: u64, scheme: WeightInit) -> Result<Tensor> {
    TensorInitializer::new(seed, scheme).weight(name, shape)
}
