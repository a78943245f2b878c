//! Dataset finalization and output: cap, shuffle, split, write JSONL.

pub mod jsonl;
pub mod split;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::DatasetConfig;
use crate::error::{Result, TuneError};
use crate::model::pair::{ConversationPair, TrainingExample};

pub use jsonl::write_jsonl;
pub use split::split_dataset;

/// Examples ready to be written, already shuffled and split.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalDataset {
    pub training: Vec<TrainingExample>,
    pub validation: Vec<TrainingExample>,
}

impl FinalDataset {
    pub fn len(&self) -> usize {
        self.training.len() + self.validation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rough token count of every prompt and response, see [`estimate_tokens`].
    pub fn estimated_tokens(&self) -> u64 {
        self.training
            .iter()
            .chain(&self.validation)
            .map(|e| estimate_tokens(&e.prompt_text) + estimate_tokens(&e.response_text))
            .sum()
    }
}

/// Approximate tokenizer count: about four characters per token.
pub fn estimate_tokens(text: &str) -> u64 {
    text.chars().count() as u64 / 4
}

/// Where the dataset was written.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub training_path: PathBuf,
    pub training_examples: usize,
    pub validation_path: PathBuf,
    pub validation_examples: usize,
    /// Combined size of both files in bytes.
    pub bytes_written: u64,
    /// Rough token count of the written examples.
    pub estimated_tokens: u64,
}

/// Flatten reply pairs and enhanced entries into training examples.
///
/// Reply pairs come first, then the enhanced entries, each group in mailbox
/// order. The result is capped at `max_examples`; fewer than `min_examples`
/// only logs a warning.
pub fn build_examples(
    pairs: Vec<ConversationPair>,
    enhanced: Vec<ConversationPair>,
    config: &DatasetConfig,
) -> Vec<TrainingExample> {
    let available = pairs.len() + enhanced.len();
    let examples: Vec<TrainingExample> = pairs
        .into_iter()
        .chain(enhanced)
        .take(config.max_examples)
        .map(TrainingExample::from)
        .collect();

    if examples.len() < available {
        info!(
            available,
            kept = examples.len(),
            "Capped dataset at max_examples"
        );
    }
    if examples.len() < config.min_examples {
        warn!(
            count = examples.len(),
            min = config.min_examples,
            "Fewer examples than recommended for fine-tuning"
        );
    }
    examples
}

/// Shuffle with the configured seed and split into training and validation.
pub fn finalize(examples: Vec<TrainingExample>, config: &DatasetConfig) -> FinalDataset {
    let (training, validation) =
        split_dataset(examples, config.validation_split_ratio, config.seed);
    FinalDataset {
        training,
        validation,
    }
}

/// Write both JSONL files into `output_dir`, creating it if needed.
pub fn write_dataset(
    output_dir: &Path,
    dataset: &FinalDataset,
    config: &DatasetConfig,
) -> Result<ExportSummary> {
    if config.training_file == config.validation_file {
        return Err(TuneError::Export(format!(
            "training and validation files are both named '{}'",
            config.training_file
        )));
    }
    std::fs::create_dir_all(output_dir).map_err(|e| TuneError::io(output_dir, e))?;

    let training_path = output_dir.join(&config.training_file);
    let validation_path = output_dir.join(&config.validation_file);
    write_jsonl(&training_path, &dataset.training)?;
    write_jsonl(&validation_path, &dataset.validation)?;

    let bytes_written: u64 = [&training_path, &validation_path]
        .iter()
        .filter_map(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .sum();

    info!(
        training = %training_path.display(),
        validation = %validation_path.display(),
        bytes = bytes_written,
        tokens = dataset.estimated_tokens(),
        "Dataset written"
    );

    Ok(ExportSummary {
        training_examples: dataset.training.len(),
        validation_examples: dataset.validation.len(),
        training_path,
        validation_path,
        bytes_written,
        estimated_tokens: dataset.estimated_tokens(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::pair::PromptSource;

    fn pair(prompt: PromptSource, response: &str) -> ConversationPair {
        ConversationPair {
            message_id: None,
            subject: String::new(),
            prompt_source: prompt,
            response_text: response.into(),
        }
    }

    #[test]
    fn test_build_examples_order_and_cap() {
        let config = DatasetConfig {
            max_examples: 2,
            ..DatasetConfig::default()
        };
        let examples = build_examples(
            vec![pair(PromptSource::Inbound("Q?".into()), "A.")],
            vec![
                pair(PromptSource::Synthetic("Write one.".into()), "One."),
                pair(PromptSource::Synthetic("Write two.".into()), "Two."),
            ],
            &config,
        );
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].prompt_text, "Q?");
        assert_eq!(examples[1].response_text, "One.");
    }

    #[test]
    fn test_finalize_split() {
        let examples: Vec<TrainingExample> = (0..20)
            .map(|i| TrainingExample {
                prompt_text: format!("p{i}"),
                response_text: format!("r{i}"),
            })
            .collect();
        let dataset = finalize(examples, &DatasetConfig::default());
        assert_eq!(dataset.validation.len(), 2);
        assert_eq!(dataset.training.len(), 18);
        assert_eq!(dataset.len(), 20);
    }

    #[test]
    fn test_write_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let dataset = FinalDataset {
            training: vec![TrainingExample {
                prompt_text: "Are you free Tuesday?".into(),
                response_text: "Yes, Tuesday works, see you then.".into(),
            }],
            validation: Vec::new(),
        };
        let summary = write_dataset(&out, &dataset, &DatasetConfig::default()).unwrap();
        assert_eq!(summary.training_examples, 1);
        assert_eq!(summary.validation_examples, 0);
        assert!(summary.training_path.ends_with("training.jsonl"));
        assert!(summary.validation_path.exists());
        assert!(summary.bytes_written > 0);
        // 21 + 33 characters
        assert_eq!(summary.estimated_tokens, 5 + 8);
    }

    #[test]
    fn test_estimate_tokens_counts_chars() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 0);
        assert_eq!(estimate_tokens("café menu"), 2);
    }

    #[test]
    fn test_write_dataset_rejects_same_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatasetConfig {
            validation_file: "training.jsonl".into(),
            ..DatasetConfig::default()
        };
        let err = write_dataset(dir.path(), &FinalDataset::default(), &config).unwrap_err();
        assert!(matches!(err, TuneError::Export(_)));
    }
}
