// Dataset module
// Curated instruction/response corpus used by the dataset tier

#[cfg(test)]
mod tests;

use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::AssistError;

/// Minimum corpus size accepted by [`validate_samples`] unless overridden
pub const DEFAULT_MIN_SAMPLES: usize = 150;

/// One curated question/answer pair in instruction format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedSample {
    pub instruction: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub input: String,
    pub output: String,
}

impl CuratedSample {
    #[inline]
    pub fn new(instruction: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            input: String::new(),
            output: output.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    /// Text embedded for similarity search: the instruction, plus the input
    /// when it is non-blank
    #[inline]
    pub fn embedding_text(&self) -> String {
        let instruction = self.instruction.trim();
        let input = self.input.trim();
        if input.is_empty() {
            instruction.to_string()
        } else {
            format!("{instruction} {input}")
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Summary of a successful validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetReport {
    pub samples: usize,
    pub with_input: usize,
}

/// Read a JSON array of samples. A missing or null `input` reads as empty.
#[inline]
pub fn load_samples(path: &Path) -> crate::Result<Vec<CuratedSample>> {
    debug!("Loading curated samples from {:?}", path);

    if !path.exists() {
        return Err(AssistError::Dataset(format!(
            "Dataset not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let raw: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| AssistError::Dataset(format!("Invalid JSON in {}: {}", path.display(), e)))?;

    let serde_json::Value::Array(items) = raw else {
        return Err(AssistError::Dataset(
            "Dataset must be a JSON array".to_string(),
        ));
    };

    let samples = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value::<CuratedSample>(item)
                .map_err(|e| AssistError::Dataset(format!("Item {}: {}", i, e)))
        })
        .collect::<crate::Result<Vec<_>>>()?;

    info!("Loaded {} dataset samples", samples.len());
    Ok(samples)
}

/// Check every sample has a non-blank instruction and output and that there
/// are at least `min_samples` of them
#[inline]
pub fn validate_samples(
    samples: &[CuratedSample],
    min_samples: usize,
) -> crate::Result<DatasetReport> {
    for (i, sample) in samples.iter().enumerate() {
        if sample.instruction.trim().is_empty() || sample.output.trim().is_empty() {
            return Err(AssistError::Dataset(format!(
                "Item {}: instruction and output must be non-empty",
                i
            )));
        }
    }

    if samples.len() < min_samples {
        return Err(AssistError::Dataset(format!(
            "Dataset has {} samples; minimum required is {}",
            samples.len(),
            min_samples
        )));
    }

    Ok(DatasetReport {
        samples: samples.len(),
        with_input: samples.iter().filter(|s| !s.input.trim().is_empty()).count(),
    })
}

/// Load and validate in one step
#[inline]
pub fn validate_dataset(path: &Path, min_samples: usize) -> crate::Result<DatasetReport> {
    let samples = load_samples(path)?;
    validate_samples(&samples, min_samples)
}
