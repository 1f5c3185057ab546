//! Per-round prompt and answer files.

use std::path::{Path, PathBuf};

use spo_types::{render_answers_artifact, QaPair};

use crate::ledger::LEDGER_FILE;
use crate::{EngineError, EngineResult};

/// On-disk layout of one run: `<workspace>/<name>/prompts/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    pub fn new(workspace: impl AsRef<Path>, name: &str) -> Self {
        Self {
            root: workspace.as_ref().join(name).join("prompts"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(LEDGER_FILE)
    }

    pub fn round_dir(&self, round: u32) -> PathBuf {
        self.root.join(format!("round_{}", round))
    }

    /// Write `round_<n>/prompt.txt`, creating the round directory.
    pub async fn write_prompt(&self, round: u32, prompt: &str) -> EngineResult<PathBuf> {
        let path = self.round_dir(round).join("prompt.txt");
        write_file(&path, prompt).await?;
        Ok(path)
    }

    /// Write `round_<n>/answers.txt`.
    pub async fn write_answers(&self, round: u32, answers: &[QaPair]) -> EngineResult<PathBuf> {
        let path = self.round_dir(round).join("answers.txt");
        write_file(&path, &render_answers_artifact(answers)).await?;
        Ok(path)
    }
}

async fn write_file(path: &Path, content: &str) -> EngineResult<()> {
    let artifact_err = |source| EngineError::Artifact {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(artifact_err)?;
    }
    tokio::fs::write(path, content).await.map_err(artifact_err)
}
