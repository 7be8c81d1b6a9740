//! Runs generated models through ONNX Runtime, the same engine the
//! downstream agent uses, to confirm a file is consumable end to end.

use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use arcmodels_core::{DType, IOName, ModelSpec, TensorSpec};
use ort::{
    session::{builder::GraphOptimizationLevel, builder::SessionBuilder, Session, SessionInputValue},
    tensor::TensorElementType,
    value::ValueType,
};
use tracing::debug;

#[derive(Clone, Debug)]
pub enum Device {
    Cpu,
    Cuda { device_id: u32 },
}

pub struct OrtBackend {
    device: Device,
}

impl OrtBackend {
    pub fn new() -> Self {
        Self { device: Device::Cpu }
    }

    pub fn with_device(device: Device) -> Self {
        Self { device }
    }

    pub fn name(&self) -> &'static str {
        "onnxruntime"
    }

    pub fn load(&self, path: &Path) -> Result<OrtModel> {
        let builder = Session::builder()
            .context("failed to create ORT session builder")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("failed to configure ORT session builder")?;

        let builder = configure_session_builder(builder, &self.device)?;

        let session = builder
            .commit_from_file(path)
            .with_context(|| format!("failed to load ONNX model {}", path.display()))?;

        let spec = build_model_spec(&session)?;
        debug!(path = %path.display(), ?spec, "loaded model into onnxruntime");

        Ok(OrtModel { spec, session })
    }
}

impl Default for OrtBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub struct OrtModel {
    spec: ModelSpec,
    session: Session,
}

/// Result of one forward pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Inference {
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

impl OrtModel {
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Runs one batch through the single-input, single-output graph.
    /// Dynamic axes in the declared input are taken as batch 1.
    pub fn infer(&mut self, input: &[f32]) -> Result<Inference> {
        let [input_spec] = self.spec.inputs.as_slice() else {
            bail!("expected one model input, found {}", self.spec.inputs.len());
        };
        let shape = input_spec.concrete_dims(1);
        let numel = shape.iter().product::<usize>().max(1);
        ensure!(
            input.len() == numel,
            "input length mismatch: got {}, expected {} for shape {:?}",
            input.len(),
            numel,
            shape
        );

        let value = ort::value::Tensor::from_array((shape, input.to_vec()))?.into_dyn();
        let ort_inputs = vec![(input_spec.name.0.clone(), SessionInputValue::from(value))];

        let outputs = self.session.run(ort_inputs)?;
        let (_, value) = outputs.iter().next().context("model produced no outputs")?;
        let array = value.try_extract_array::<f32>()?;

        Ok(Inference {
            shape: array.shape().to_vec(),
            values: array.iter().copied().collect(),
        })
    }

    /// Forward pass on an all-zero input.
    pub fn probe(&mut self) -> Result<Inference> {
        let [input_spec] = self.spec.inputs.as_slice() else {
            bail!("expected one model input, found {}", self.spec.inputs.len());
        };
        let numel = input_spec
            .concrete_dims(1)
            .iter()
            .product::<usize>()
            .max(1);
        self.infer(&vec![0.0; numel])
    }
}

fn build_model_spec(session: &Session) -> Result<ModelSpec> {
    let inputs = session
        .inputs
        .iter()
        .map(|input| tensor_spec_from_value_type(&input.name, &input.input_type))
        .collect::<Result<Vec<_>>>()?;

    let outputs = session
        .outputs
        .iter()
        .map(|output| tensor_spec_from_value_type(&output.name, &output.output_type))
        .collect::<Result<Vec<_>>>()?;

    Ok(ModelSpec { inputs, outputs })
}

fn configure_session_builder(builder: SessionBuilder, device: &Device) -> Result<SessionBuilder> {
    match device {
        Device::Cpu => Ok(builder),
        Device::Cuda { device_id } => configure_cuda(builder, *device_id),
    }
}

fn configure_cuda(builder: SessionBuilder, device_id: u32) -> Result<SessionBuilder> {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::cuda::CUDAExecutionProvider;
        let ep = CUDAExecutionProvider::default()
            .with_device_id(device_id as i32)
            .build();
        builder
            .with_execution_providers([ep])
            .context("failed to enable ORT CUDA execution provider")
    }
    #[cfg(not(feature = "cuda"))]
    {
        let _ = (builder, device_id);
        bail!("CUDA requested but arcmodels-backend-ort was built without the `cuda` feature")
    }
}

fn tensor_spec_from_value_type(name: &str, value_type: &ValueType) -> Result<TensorSpec> {
    let ValueType::Tensor { ty, shape, .. } = value_type else {
        bail!("unsupported non-tensor IO value type");
    };

    let dtype = ort_tensor_element_to_dtype(*ty)?;
    let dims = shape
        .iter()
        .map(|d| if *d < 0 { None } else { Some(*d as usize) })
        .collect::<Vec<_>>();

    Ok(TensorSpec {
        name: IOName(name.to_string()),
        dtype,
        dims,
    })
}

fn ort_tensor_element_to_dtype(ty: TensorElementType) -> Result<DType> {
    match ty {
        TensorElementType::Float32 => Ok(DType::F32),
        _ => bail!("unsupported tensor element type: {ty}"),
    }
}

/// Parses `cpu` or `cuda:N`.
pub fn parse_device(raw: &str) -> Result<Device> {
    if raw.eq_ignore_ascii_case("cpu") {
        return Ok(Device::Cpu);
    }

    if let Some(rest) = raw.strip_prefix("cuda:") {
        let device_id: u32 = rest.parse().context("invalid cuda device id")?;
        return Ok(Device::Cuda { device_id });
    }

    bail!("unsupported device: {raw} (expected cpu or cuda:N)");
}
