use crate::{
    error::{ClassifierError, Result},
    tensor::ClassScores,
    vocabulary::Vocabulary,
};
use common::span_debug;
use serde::Serialize;

/// The winning category and its raw score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    #[serde(rename = "class")]
    pub label: String,
    pub confidence: f32,
}

pub struct ResultInterpreter {
    vocabulary: Vocabulary,
}

impl ResultInterpreter {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Map the arg-max score to its label. The score is reported as-is,
    /// without clamping or softmax. A NaN or infinite winner is a model
    /// fault and yields `Backend`.
    pub fn interpret(&self, scores: &ClassScores) -> Result<ClassificationResult> {
        let _s = span_debug!("interpret");

        self.vocabulary.check_outputs(scores.len())?;

        let (index, confidence) = scores.argmax().ok_or(ClassifierError::EmptyVocabulary)?;
        if !confidence.is_finite() {
            return Err(ClassifierError::backend(anyhow::anyhow!(
                "model produced non-finite score {confidence} at index {index}"
            )));
        }
        let label = self
            .vocabulary
            .get(index)
            .ok_or(ClassifierError::VocabularyMismatch {
                labels: self.vocabulary.len(),
                outputs: scores.len(),
            })?
            .to_string();

        Ok(ClassificationResult { label, confidence })
    }
}
