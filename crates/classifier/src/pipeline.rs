use crate::{
    backend::InferenceBackend,
    decode::ImageDecoder,
    engine::InferenceEngine,
    error::Result,
    postprocessing::{ClassificationResult, ResultInterpreter},
    preprocessing::{PixelScale, TensorPreprocessor},
    tensor::DecodedImage,
    vocabulary::Vocabulary,
};
use common::span;

#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifierOptions {
    pub pixel_scale: PixelScale,
}

/// Decode → batch → infer → interpret, built once per process and shared
/// read-only across requests.
pub struct Classifier<B: InferenceBackend> {
    decoder: ImageDecoder,
    preprocessor: TensorPreprocessor,
    engine: InferenceEngine<B>,
    interpreter: ResultInterpreter,
}

impl<B: InferenceBackend> Classifier<B> {
    /// Fails with `VocabularyMismatch` when the model declares an output
    /// width different from the vocabulary length.
    pub fn new(backend: B, vocabulary: Vocabulary, options: ClassifierOptions) -> Result<Self> {
        if let Some(outputs) = backend.signature().num_classes {
            vocabulary.check_outputs(outputs)?;
        } else {
            tracing::warn!(
                labels = vocabulary.len(),
                "Model output width is dynamic; vocabulary is checked on every response"
            );
        }

        tracing::info!(
            labels = ?vocabulary.labels(),
            pixel_scale = options.pixel_scale.as_str(),
            "Classifier ready"
        );

        Ok(Self {
            decoder: ImageDecoder::new(),
            preprocessor: TensorPreprocessor::new(options.pixel_scale),
            engine: InferenceEngine::new(backend),
            interpreter: ResultInterpreter::new(vocabulary),
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        self.interpreter.vocabulary()
    }

    pub fn engine(&self) -> &InferenceEngine<B> {
        &self.engine
    }

    pub fn classify_image(&self, bytes: &[u8]) -> Result<ClassificationResult> {
        let _s = span!("classify_image");

        let image = self.decoder.decode(bytes)?;
        self.classify_decoded(image)
    }

    pub fn classify_decoded(&self, image: DecodedImage) -> Result<ClassificationResult> {
        let (height, width, channels) = (image.height(), image.width(), image.channels());

        let batch = self.preprocessor.to_batch(image);
        let scores = self.engine.classify(&batch)?;
        let result = self.interpreter.interpret(&scores)?;

        tracing::debug!(
            height,
            width,
            channels,
            label = %result.label,
            confidence = result.confidence,
            "Image classified"
        );

        Ok(result)
    }
}
