use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Cannot open output file '{path}': {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("Failed to write output file '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// A plain-text output file owned by one analysis.
///
/// A sink opened without a path is disabled: every write succeeds and nothing is
/// persisted. Buffered data is flushed when the sink is dropped, on every exit
/// path.
#[derive(Debug)]
pub struct OutputSink {
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
}

impl OutputSink {
    pub fn open(path: Option<&Path>) -> Result<Self, SinkError> {
        let Some(path) = path else {
            return Ok(Self::disabled());
        };
        let file = File::create(path).map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn disabled() -> Self {
        Self {
            path: None,
            writer: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn wrap(&self, source: io::Error) -> SinkError {
        SinkError::Write {
            path: self.path.clone().unwrap_or_default(),
            source,
        }
    }

    /// Appends text at the current end of the file.
    pub fn append(&mut self, text: &str) -> Result<(), SinkError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let result = writer.write_all(text.as_bytes());
        result.map_err(|e| self.wrap(e))
    }

    /// Truncates the file and writes `content` in its place.
    pub fn rewrite(&mut self, content: &str) -> Result<(), SinkError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let result = (|| -> io::Result<()> {
            writer.flush()?;
            let file = writer.get_mut();
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            writer.write_all(content.as_bytes())?;
            writer.flush()
        })();
        result.map_err(|e| self.wrap(e))
    }

    pub fn flush(&mut self) -> Result<(), SinkError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let result = writer.flush();
        result.map_err(|e| self.wrap(e))
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("{e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn disabled_sink_accepts_writes() {
        let mut sink = OutputSink::open(None).unwrap();
        assert!(!sink.is_enabled());
        sink.append("ignored\n").unwrap();
        sink.rewrite("ignored\n").unwrap();
        assert!(sink.path().is_none());
    }

    #[test]
    fn append_then_drop_persists_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.dat");
        {
            let mut sink = OutputSink::open(Some(path.as_path())).unwrap();
            sink.append("1 2\n").unwrap();
            sink.append("3 4\n").unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1 2\n3 4\n");
    }

    #[test]
    fn rewrite_replaces_previous_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("histo.dat");
        let mut sink = OutputSink::open(Some(path.as_path())).unwrap();
        sink.rewrite("a much longer first checkpoint\n").unwrap();
        sink.rewrite("short\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short\n");
    }

    #[test]
    fn open_fails_for_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.dat");
        assert!(matches!(
            OutputSink::open(Some(path.as_path())),
            Err(SinkError::Open { .. })
        ));
    }
}
