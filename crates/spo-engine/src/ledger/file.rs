//! JSON-lines ledger, one decision per line.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use spo_types::Decision;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{check_sequence, DecisionLedger, LedgerError, LedgerResult};

/// File name of the ledger inside a run's prompt directory.
pub const LEDGER_FILE: &str = "results.jsonl";

/// Append-only file ledger.
///
/// Appends are serialized through `last_round`, which also caches the highest
/// round on disk so the sequence check does not reread the file.
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    last_round: Mutex<Option<u32>>,
}

impl FileLedger {
    /// Open (or prepare to create) the ledger at `path`.
    ///
    /// A file that does not parse is moved aside to
    /// `<name>.corrupt-<timestamp>` and the ledger starts empty. A last record
    /// missing its newline gets one, so the next append starts a fresh line.
    pub async fn open(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let last_round = match tokio::fs::read(&path).await {
            Ok(bytes) => match parse_decisions(&bytes) {
                Ok(history) => {
                    if bytes.last().is_some_and(|byte| *byte != b'\n') {
                        append_bytes(&path, b"\n").await?;
                    }
                    history.iter().map(|d| d.round).max()
                }
                Err(err) => {
                    let moved = quarantine(&path).await?;
                    tracing::warn!(
                        path = %path.display(),
                        moved_to = %moved.display(),
                        error = %err,
                        "Ledger is unreadable, starting a new one"
                    );
                    None
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };

        tracing::debug!(path = %path.display(), last_round = ?last_round, "Opened ledger");

        Ok(Self {
            path,
            last_round: Mutex::new(last_round),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_decisions(bytes: &[u8]) -> LedgerResult<Vec<Decision>> {
    let mut decisions = Vec::new();
    for (index, line) in bytes.split(|byte| *byte == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let decision = serde_json::from_slice(line).map_err(|source| LedgerError::Corrupt {
            line: index + 1,
            source,
        })?;
        decisions.push(decision);
    }
    Ok(decisions)
}

async fn read_decisions(path: &Path) -> LedgerResult<Vec<Decision>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => parse_decisions(&bytes),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

async fn quarantine(path: &Path) -> LedgerResult<PathBuf> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| LEDGER_FILE.to_string());
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
    let moved = path.with_file_name(format!("{}.corrupt-{}", name, stamp));
    tokio::fs::rename(path, &moved).await?;
    Ok(moved)
}

async fn append_bytes(path: &Path, bytes: &[u8]) -> LedgerResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_data().await?;
    Ok(())
}

#[async_trait]
impl DecisionLedger for FileLedger {
    async fn append(&self, decision: Decision) -> LedgerResult<()> {
        let mut last_round = self.last_round.lock().await;
        check_sequence(*last_round, decision.round)?;

        let mut json = serde_json::to_string(&decision)?;
        json.push('\n');
        append_bytes(&self.path, json.as_bytes()).await?;

        *last_round = Some(decision.round);
        Ok(())
    }

    async fn history(&self) -> LedgerResult<Vec<Decision>> {
        read_decisions(&self.path).await
    }

    async fn last_round(&self) -> LedgerResult<Option<u32>> {
        Ok(*self.last_round.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::decision;

    fn quarantined_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("results.jsonl.corrupt-"))
            })
            .collect()
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run").join(LEDGER_FILE);

        let ledger = FileLedger::open(&path).await.unwrap();
        ledger.append(decision(1, true)).await.unwrap();
        ledger.append(decision(2, true)).await.unwrap();
        ledger.append(decision(3, false)).await.unwrap();
        drop(ledger);

        let reopened = FileLedger::open(&path).await.unwrap();
        assert_eq!(reopened.last_round().await.unwrap(), Some(3));
        assert_eq!(reopened.history().await.unwrap().len(), 3);
        assert_eq!(reopened.current_best().await.unwrap().unwrap().round, 2);

        let err = reopened.append(decision(3, true)).await.unwrap_err();
        assert!(matches!(err, LedgerError::OutOfSequence { expected: 4, found: 3 }));
    }

    #[tokio::test]
    async fn writes_legacy_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LEDGER_FILE);

        let ledger = FileLedger::open(&path).await.unwrap();
        ledger.append(decision(1, true)).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(value["succeed"], true);
        assert!(value["tokens"].is_u64());
        assert!(value["time"].is_string());
    }

    #[tokio::test]
    async fn unreadable_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LEDGER_FILE);
        let garbage = "{not json}\n{\"round\":1,\"prompt\":\"trunc";
        tokio::fs::write(&path, garbage).await.unwrap();

        let ledger = FileLedger::open(&path).await.unwrap();
        assert_eq!(ledger.last_round().await.unwrap(), None);
        assert!(ledger.history().await.unwrap().is_empty());

        let moved = quarantined_files(dir.path());
        assert_eq!(moved.len(), 1);
        assert_eq!(std::fs::read_to_string(&moved[0]).unwrap(), garbage);

        ledger.append(decision(1, true)).await.unwrap();
        ledger.append(decision(2, false)).await.unwrap();
        let history = ledger.history().await.unwrap();
        assert_eq!(history.iter().map(|d| d.round).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn unterminated_last_record_is_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LEDGER_FILE);
        let record = serde_json::to_string(&decision(1, true)).unwrap();
        tokio::fs::write(&path, record).await.unwrap();

        let ledger = FileLedger::open(&path).await.unwrap();
        assert_eq!(ledger.last_round().await.unwrap(), Some(1));
        ledger.append(decision(2, false)).await.unwrap();

        assert_eq!(ledger.history().await.unwrap().len(), 2);
        assert!(quarantined_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn corruption_after_open_fails_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LEDGER_FILE);

        let ledger = FileLedger::open(&path).await.unwrap();
        ledger.append(decision(1, true)).await.unwrap();
        append_bytes(&path, b"{not json}\n").await.unwrap();

        assert!(matches!(
            ledger.history().await,
            Err(LedgerError::Corrupt { line: 2, .. })
        ));
    }

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::open(dir.path().join(LEDGER_FILE)).await.unwrap();
        assert!(ledger.history().await.unwrap().is_empty());
        assert!(ledger.current_best().await.unwrap().is_none());
    }
}
