use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to read history log {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to append to history log {path}: {source}")]
    Append {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode history pair: {0}")]
    Encode(#[source] serde_json::Error),
}

fn read_error(path: &Path, source: std::io::Error) -> HistoryError {
    HistoryError::Read {
        path: path.display().to_string(),
        source,
    }
}

fn append_error(path: &Path, source: std::io::Error) -> HistoryError {
    HistoryError::Append {
        path: path.display().to_string(),
        source,
    }
}

/// Bounded sliding window of (input, output) pairs, optionally mirrored
/// to an append-only JSONL log of `[input, output]` lines.
///
/// Each append persists synchronously before the window is truncated, so
/// a crash between the two is observable as "logged but not yet
/// windowed". The log is replayed in full at startup to seed memory.
pub struct ConversationHistory<I, O> {
    entries: Vec<(I, O)>,
    max_length: usize,
    save_file: Option<PathBuf>,
}

impl<I, O> ConversationHistory<I, O>
where
    I: Serialize + DeserializeOwned,
    O: Serialize + DeserializeOwned,
{
    pub fn new(max_length: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_length,
            save_file: None,
        }
    }

    /// In-memory window mirrored to `path`. An existing log is replayed
    /// before the window is applied; lines that no longer parse are
    /// skipped.
    pub fn with_save_file(max_length: usize, path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let mut history = Self::new(max_length);
        let path = path.into();
        history.replay(&path)?;
        history.save_file = Some(path);
        Ok(history)
    }

    fn replay(&mut self, path: &Path) -> Result<(), HistoryError> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(read_error(path, err)),
        };

        let reader = BufReader::new(file);
        let mut replayed = 0usize;
        for line in reader.lines() {
            let line = line.map_err(|err| read_error(path, err))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<(I, O)>(&line) {
                Ok((input, output)) => {
                    self.entries.push((input, output));
                    replayed += 1;
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unparseable history line");
                }
            }
        }
        self.truncate();
        debug!(replayed, retained = self.entries.len(), "replayed history log");
        Ok(())
    }

    /// Appends one completed turn: persisted first, windowed second.
    pub fn append(&mut self, input: I, output: O) -> Result<(), HistoryError> {
        self.persist(&input, &output)?;
        self.entries.push((input, output));
        self.truncate();
        Ok(())
    }

    fn persist(&self, input: &I, output: &O) -> Result<(), HistoryError> {
        let Some(path) = &self.save_file else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| append_error(parent, err))?;
            }
        }
        let line = serde_json::to_string(&(input, output)).map_err(HistoryError::Encode)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| append_error(path, err))?;
        writeln!(file, "{line}").map_err(|err| append_error(path, err))
    }

    fn truncate(&mut self) {
        if self.entries.len() > self.max_length {
            let drop = self.entries.len() - self.max_length;
            self.entries.drain(..drop);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(I, O)> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
