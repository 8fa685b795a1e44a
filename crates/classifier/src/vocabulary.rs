use crate::error::{ClassifierError, Result};

pub const SOIL_TYPES: [&str; 4] = ["Alluvial Soil", "Black Soil", "Clay Soil", "Red Soil"];

/// Ordered category labels; position `i` names model output `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    labels: Vec<String>,
}

impl Vocabulary {
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels
            .into_iter()
            .map(|l| l.into().trim().to_string())
            .collect();

        if labels.is_empty() || labels.iter().any(|l| l.is_empty()) {
            return Err(ClassifierError::EmptyVocabulary);
        }

        Ok(Self { labels })
    }

    pub fn soil_types() -> Self {
        Self {
            labels: SOIL_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Fails unless the model produces exactly one score per label.
    pub fn check_outputs(&self, outputs: usize) -> Result<()> {
        if outputs == self.len() {
            Ok(())
        } else {
            Err(ClassifierError::VocabularyMismatch {
                labels: self.len(),
                outputs,
            })
        }
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::soil_types()
    }
}
