//! Optimization templates and their YAML documents.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::QaPair;

/// Gold pairs sampled per round when no size is configured.
pub const DEFAULT_SAMPLE_K: usize = 3;

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Template loading and validation errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read template {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse template {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid template: {0}")]
    Invalid(String),
}

/// On-disk YAML shape of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDocument {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub requirements: String,
    /// Target answer length in words. Non-numeric values are ignored.
    #[serde(default, deserialize_with = "lenient_count")]
    pub count: Option<u32>,
    #[serde(default)]
    pub qa: Vec<QaPair>,
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok()))
}

impl TemplateDocument {
    /// Skeleton written by `spo template init`.
    pub fn skeleton() -> Self {
        Self {
            prompt: String::new(),
            requirements: String::new(),
            count: None,
            qa: vec![QaPair::new("", "")],
        }
    }

    pub fn from_yaml_str(path: &Path, content: &str) -> TemplateResult<Self> {
        serde_yaml::from_str(content).map_err(|source| TemplateError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> TemplateResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TemplateError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(path, &content)
    }

    /// Write the document as YAML, trimming whitespace around QA text.
    pub fn save(&self, path: impl AsRef<Path>) -> TemplateResult<()> {
        let path = path.as_ref();
        let normalized = Self {
            prompt: self.prompt.clone(),
            requirements: self.requirements.clone(),
            count: self.count,
            qa: self
                .qa
                .iter()
                .map(|pair| QaPair::new(pair.question.trim(), pair.answer.trim()))
                .collect(),
        };
        let yaml = serde_yaml::to_string(&normalized).map_err(|source| TemplateError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let io_err = |source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, yaml).map_err(io_err)
    }
}

/// Validated run input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub seed_prompt: String,
    pub requirements: String,
    pub target_length: Option<u32>,
    pub gold_qa: Vec<QaPair>,
}

impl Template {
    pub fn load(path: impl AsRef<Path>) -> TemplateResult<Self> {
        TemplateDocument::load(path)?.try_into()
    }

    /// Draw the gold subset used for one round.
    pub fn sample_gold<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Vec<QaPair> {
        sample_qa(&self.gold_qa, k, rng)
    }

    pub fn length_clause(&self) -> String {
        length_clause(self.target_length)
    }
}

impl TryFrom<TemplateDocument> for Template {
    type Error = TemplateError;

    fn try_from(doc: TemplateDocument) -> TemplateResult<Self> {
        if doc.qa.is_empty() {
            return Err(TemplateError::Invalid(
                "template must contain at least one qa entry".to_string(),
            ));
        }
        if doc.qa.iter().all(|pair| pair.question.trim().is_empty()) {
            return Err(TemplateError::Invalid(
                "template qa entries have no questions".to_string(),
            ));
        }

        Ok(Self {
            seed_prompt: doc.prompt,
            requirements: doc.requirements,
            target_length: doc.count,
            gold_qa: doc.qa,
        })
    }
}

/// Uniform sample of `k` pairs without replacement, or all of them when
/// `pairs.len() <= k`.
pub fn sample_qa<R: Rng + ?Sized>(pairs: &[QaPair], k: usize, rng: &mut R) -> Vec<QaPair> {
    if pairs.len() <= k {
        return pairs.to_vec();
    }
    pairs.choose_multiple(rng, k).cloned().collect()
}

/// The `", within N words"` clause appended to the generator's output request.
pub fn length_clause(target_length: Option<u32>) -> String {
    match target_length {
        Some(words) => format!(", within {} words", words),
        None => String::new(),
    }
}
