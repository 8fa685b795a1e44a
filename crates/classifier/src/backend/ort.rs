use super::{InferenceBackend, ModelSignature};
use crate::{
    error::{ClassifierError, Result},
    tensor::InputBatch,
};
use anyhow::Context;
use ndarray::{Array2, Ix2};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::{TensorRef, ValueType},
};
use serde::Deserialize;
use std::{path::Path, str::FromStr, sync::Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    #[default]
    Cpu,
    Cuda,
}

impl FromStr for ExecutionProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            other => Err(format!(
                "{} is not a supported execution provider. Use either `cpu` or `cuda`.",
                other
            )),
        }
    }
}

/// ONNX Runtime session exposing an NHWC image classifier.
///
/// `Session::run` needs exclusive access, so concurrent requests take turns
/// on the mutex.
pub struct OrtBackend {
    session: Mutex<Session>,
    signature: ModelSignature,
}

impl OrtBackend {
    pub fn load_model(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::load_model_with_provider(path, ExecutionProvider::Cpu)
    }

    /// Load model with specified execution provider
    pub fn load_model_with_provider(
        path: impl AsRef<Path>,
        provider: ExecutionProvider,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();

        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        #[cfg_attr(not(feature = "cuda"), allow(unused_mut))]
        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?;

        match provider {
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                #[cfg(feature = "cuda")]
                {
                    builder = builder.with_execution_providers([
                        ort::execution_providers::CUDAExecutionProvider::default()
                            .with_device_id(0)
                            .build()
                            .error_on_failure(),
                    ])?;
                }
                #[cfg(not(feature = "cuda"))]
                anyhow::bail!("CUDA execution provider requested but the `cuda` feature is off");
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder
            .commit_from_file(path)
            .with_context(|| format!("failed to load model from {}", path.display()))?;

        let signature = read_signature(&session)?;

        tracing::info!(
            path = %path.display(),
            signature = ?signature,
            "Model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            signature,
        })
    }
}

/// Interpret an ONNX-style dimension list: negative values are dynamic.
fn fixed_dims(dims: &[i64]) -> Vec<Option<usize>> {
    dims.iter()
        .map(|&d| usize::try_from(d).ok().filter(|&d| d > 0))
        .collect()
}

fn tensor_dims(value_type: &ValueType) -> Option<Vec<i64>> {
    match value_type {
        ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
        _ => None,
    }
}

fn read_signature(session: &Session) -> anyhow::Result<ModelSignature> {
    let input = session
        .inputs
        .first()
        .context("model declares no inputs")?;
    let output = session
        .outputs
        .first()
        .context("model declares no outputs")?;

    let input_dims = tensor_dims(&input.input_type)
        .with_context(|| format!("model input '{}' is not a tensor", input.name))?;
    let output_dims = tensor_dims(&output.output_type)
        .with_context(|| format!("model output '{}' is not a tensor", output.name))?;

    let input_dims = fixed_dims(&input_dims);
    let output_dims = fixed_dims(&output_dims);

    let &[_, height, width, channels] = input_dims.as_slice() else {
        anyhow::bail!(
            "model input '{}' has rank {}, expected 4 (batch, height, width, channels)",
            input.name,
            input_dims.len()
        );
    };
    let &[_, num_classes] = output_dims.as_slice() else {
        anyhow::bail!(
            "model output '{}' has rank {}, expected 2 (batch, classes)",
            output.name,
            output_dims.len()
        );
    };

    Ok(ModelSignature {
        input_name: input.name.clone(),
        output_name: output.name.clone(),
        height,
        width,
        channels,
        num_classes,
    })
}

impl InferenceBackend for OrtBackend {
    fn signature(&self) -> &ModelSignature {
        &self.signature
    }

    fn infer(&self, batch: &InputBatch) -> Result<Array2<f32>> {
        let input = TensorRef::from_array_view(batch.view()).map_err(ClassifierError::backend)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::backend(anyhow::anyhow!("session lock poisoned")))?;

        let outputs = session
            .run(ort::inputs![self.signature.input_name.as_str() => input])
            .map_err(ClassifierError::backend)?;

        let scores = outputs[self.signature.output_name.as_str()]
            .try_extract_array::<f32>()
            .map_err(ClassifierError::backend)?;

        let actual = format!("{:?}", scores.shape());
        scores
            .into_owned()
            .into_dimensionality::<Ix2>()
            .map_err(|_| ClassifierError::shape_mismatch("[1, classes]", actual))
    }
}
