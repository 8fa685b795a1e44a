use crate::{
    backend::{InferenceBackend, ModelSignature},
    error::{ClassifierError, Result},
    tensor::{ClassScores, InputBatch, ShapeDisplay},
};
use common::span;

/// Owns the loaded model and runs one batch through it per call.
pub struct InferenceEngine<B: InferenceBackend> {
    backend: B,
}

impl<B: InferenceBackend> InferenceEngine<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn signature(&self) -> &ModelSignature {
        self.backend.signature()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn classify(&self, batch: &InputBatch) -> Result<ClassScores> {
        let _s = span!("model_inference");

        self.check_input(batch)?;

        let output = self.backend.infer(batch)?;

        let (rows, classes) = output.dim();
        if rows != InputBatch::BATCH_SIZE {
            return Err(ClassifierError::shape_mismatch(
                format!("[{}, {}]", InputBatch::BATCH_SIZE, classes),
                format!("[{rows}, {classes}]"),
            ));
        }
        if let Some(expected) = self.signature().num_classes
            && expected != classes
        {
            return Err(ClassifierError::shape_mismatch(
                format!("[1, {expected}]"),
                format!("[1, {classes}]"),
            ));
        }

        Ok(ClassScores::new(output.row(0).to_vec()))
    }

    fn check_input(&self, batch: &InputBatch) -> Result<()> {
        let expected = self.signature().input_shape();
        let actual = batch.shape();

        let compatible = expected
            .iter()
            .zip(actual)
            .all(|(want, got)| want.is_none_or(|w| w == got));

        if compatible {
            Ok(())
        } else {
            Err(ClassifierError::shape_mismatch(
                ShapeDisplay(&expected).to_string(),
                format!("{actual:?}"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::DecodedImage;
    use ndarray::Array2;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedBackend {
        signature: ModelSignature,
        output: Array2<f32>,
        calls: AtomicUsize,
    }

    impl FixedBackend {
        fn new(signature: ModelSignature, output: Array2<f32>) -> Self {
            Self {
                signature,
                output,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl InferenceBackend for FixedBackend {
        fn signature(&self) -> &ModelSignature {
            &self.signature
        }

        fn infer(&self, _batch: &InputBatch) -> Result<Array2<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    fn batch(height: usize, width: usize, channels: usize) -> InputBatch {
        let image =
            DecodedImage::from_samples(height, width, channels, vec![0.5; height * width * channels])
                .unwrap();
        InputBatch::from_image(image)
    }

    fn rgb_signature() -> ModelSignature {
        ModelSignature::dynamic("input", "scores")
            .with_channels(3)
            .with_num_classes(4)
    }

    #[test]
    fn test_classify_returns_single_row() {
        let output = Array2::from_shape_vec((1, 4), vec![0.1, 0.7, 0.05, 0.15]).unwrap();
        let engine = InferenceEngine::new(FixedBackend::new(rgb_signature(), output));

        let scores = engine.classify(&batch(8, 12, 3)).unwrap();

        assert_eq!(scores.as_slice(), &[0.1, 0.7, 0.05, 0.15]);
        assert_eq!(engine.backend().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wrong_channel_count_is_rejected_before_inference() {
        let output = Array2::zeros((1, 4));
        let engine = InferenceEngine::new(FixedBackend::new(rgb_signature(), output));

        let err = engine.classify(&batch(8, 8, 4)).unwrap_err();

        match err {
            ClassifierError::ShapeMismatch { expected, actual } => {
                assert_eq!(expected, "[1, ?, ?, 3]");
                assert_eq!(actual, "[1, 8, 8, 4]");
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
        assert_eq!(engine.backend().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fixed_spatial_dimensions_are_enforced() {
        let signature = rgb_signature().with_spatial(256, 256);
        let engine = InferenceEngine::new(FixedBackend::new(signature, Array2::zeros((1, 4))));

        assert!(engine.classify(&batch(256, 256, 3)).is_ok());
        assert!(matches!(
            engine.classify(&batch(255, 256, 3)),
            Err(ClassifierError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_dynamic_signature_accepts_any_shape() {
        let signature = ModelSignature::dynamic("input", "scores");
        let engine = InferenceEngine::new(FixedBackend::new(signature, Array2::zeros((1, 2))));

        assert!(engine.classify(&batch(1, 1, 1)).is_ok());
        assert!(engine.classify(&batch(30, 20, 4)).is_ok());
    }

    #[test]
    fn test_multi_row_output_is_rejected() {
        let engine = InferenceEngine::new(FixedBackend::new(
            rgb_signature(),
            Array2::zeros((2, 4)),
        ));

        assert!(matches!(
            engine.classify(&batch(4, 4, 3)),
            Err(ClassifierError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_output_width_must_match_signature() {
        let engine = InferenceEngine::new(FixedBackend::new(
            rgb_signature(),
            Array2::zeros((1, 5)),
        ));

        assert!(matches!(
            engine.classify(&batch(4, 4, 3)),
            Err(ClassifierError::ShapeMismatch { .. })
        ));
    }
}
