//! Append-only outcome log.
//!
//! One record per finished or abandoned game:
//!
//! ```text
//! #Mon Oct 12 18:03:11 2026 player: alice won against player: bob
//! XXXXXO-O-O---O-----------
//!
//! ```
//!
//! The file handle sits behind its own mutex (the log lock), separate
//! from the registry lock, so appends never block registry access.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use game_core::{Board, Outcome};
use game_protocol::text_codec::format_outcome;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

/// asctime-style timestamp, e.g. `Mon Oct 12 18:03:11 2026`.
const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

#[derive(Debug)]
pub struct OutcomeLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl OutcomeLog {
    /// Open (or create) the log for appending.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(OutcomeLog {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Outcome line stamped with the current local time.
    pub fn format_line(&self, outcome: &Outcome) -> String {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        format_outcome(outcome, &timestamp)
    }

    /// Append one record and return its outcome line.
    pub async fn record(&self, outcome: &Outcome, board: &Board) -> io::Result<String> {
        let line = self.format_line(outcome);

        let mut entry = Vec::with_capacity(line.len() + 32);
        entry.extend_from_slice(line.as_bytes());
        entry.push(b'\n');
        entry.extend_from_slice(&board.to_bytes());
        entry.extend_from_slice(b"\n\n");

        {
            let mut file = self.file.lock().await;
            file.write_all(&entry).await?;
            file.flush().await?;
        }

        info!("{}", line);
        Ok(line)
    }

    /// Flush and sync before teardown.
    pub async fn close(&self) -> io::Result<()> {
        let mut file = self.file.lock().await;
        file.flush().await?;
        file.sync_all().await
    }
}
