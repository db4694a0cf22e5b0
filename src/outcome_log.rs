//! Append-only log of finalized rounds.
//!
//! Rows are handed to a background task over a bounded channel so that a
//! slow disk never holds up a round transition. When the channel is full the
//! row is dropped with a warning.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

use crate::game::{Decision, RoundFeatures};

/// Header matching the round dataset the decision model is trained on.
pub const CSV_HEADER: &str =
    "Nivel,Largo_Patron,Aciertos,Errores,Accuracy,Tiempo_por_Acierto,Racha,Accion,Timestamp";

const QUEUE_CAPACITY: usize = 256;

/// One finalized round and the decision taken for it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundRecord {
    pub features: RoundFeatures,
    pub decision: Decision,
    pub timestamp: DateTime<Utc>,
}

impl RoundRecord {
    pub fn new(features: RoundFeatures, decision: Decision) -> Self {
        Self {
            features,
            decision,
            timestamp: Utc::now(),
        }
    }

    pub fn to_csv_row(&self) -> String {
        let f = &self.features;
        format!(
            "{},{},{},{},{:.3},{:.3},{},{},{}\n",
            f.level,
            f.pattern_length,
            f.correct_count,
            f.error_count,
            f.accuracy,
            f.time_per_correct,
            f.streak,
            self.decision.model_label(),
            self.timestamp.to_rfc3339()
        )
    }
}

/// Receives finalized rounds. Implementations must not block.
pub trait RoundLogger: Send + Sync + 'static {
    fn record(&self, record: RoundRecord);
}

enum LogTask {
    Row(Box<RoundRecord>),
    Flush(oneshot::Sender<()>),
}

/// CSV writer running on its own task.
pub struct CsvRoundLogger {
    task_tx: mpsc::Sender<LogTask>,
    path: PathBuf,
}

impl CsvRoundLogger {
    /// Spawn the writer task for `path`. The file is created on first write.
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (task_tx, task_rx) = mpsc::channel(QUEUE_CAPACITY);

        let task_path = path.clone();
        tokio::spawn(async move {
            run_writer(task_path, task_rx).await;
        });

        Self { task_tx, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait until every queued row has been written.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.task_tx.send(LogTask::Flush(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
    }
}

impl RoundLogger for CsvRoundLogger {
    fn record(&self, record: RoundRecord) {
        if let Err(e) = self.task_tx.try_send(LogTask::Row(Box::new(record))) {
            tracing::warn!("Dropping round log row: {}", e);
        }
    }
}

async fn run_writer(path: PathBuf, mut task_rx: mpsc::Receiver<LogTask>) {
    tracing::debug!("Round log writer started for {:?}", path);

    while let Some(task) = task_rx.recv().await {
        match task {
            LogTask::Row(record) => {
                if let Err(e) = append_row(&path, &record).await {
                    tracing::error!("Failed to append round to {:?}: {}", path, e);
                }
            }
            LogTask::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    tracing::debug!("Round log writer stopped");
}

async fn append_row(path: &Path, record: &RoundRecord) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    let mut out = String::new();
    if file.metadata().await?.len() == 0 {
        out.push_str(CSV_HEADER);
        out.push('\n');
    }
    out.push_str(&record.to_csv_row());

    file.write_all(out.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(decision: Decision) -> RoundRecord {
        RoundRecord::new(RoundFeatures::compute(2, 3, 3, 0, 4.5, 2), decision)
    }

    #[test]
    fn row_uses_model_labels() {
        let row = record(Decision::Raise).to_csv_row();
        assert!(row.starts_with("2,3,3,0,1.000,1.500,2,SUBIR,"));
        assert!(row.ends_with('\n'));
    }

    #[tokio::test]
    async fn writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("rounds.csv");
        let logger = CsvRoundLogger::spawn(&path);

        logger.record(record(Decision::Hold));
        logger.record(record(Decision::Lower));
        logger.flush().await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].contains(",MANTENER,"));
        assert!(lines[2].contains(",BAJAR,"));
    }

    #[tokio::test]
    async fn appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.csv");
        tokio::fs::write(&path, format!("{}\n1,2,2,0,1.000,1.000,1,SUBIR,x\n", CSV_HEADER))
            .await
            .unwrap();

        let logger = CsvRoundLogger::spawn(&path);
        logger.record(record(Decision::Raise));
        logger.flush().await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.matches(CSV_HEADER).count(), 1);
        assert_eq!(contents.lines().count(), 3);
    }

    #[tokio::test]
    async fn unwritable_path_keeps_writer_alive() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, "not a directory").await.unwrap();

        let logger = CsvRoundLogger::spawn(blocker.join("rounds.csv"));
        logger.record(record(Decision::Hold));
        logger.record(record(Decision::Raise));
        logger.flush().await;

        assert!(!blocker.join("rounds.csv").exists());
    }
}
