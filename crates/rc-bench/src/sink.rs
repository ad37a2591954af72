//! Append-only sinks: the workload trace log and the results file.
//!
//! Both are opened once, before any benchmark runs, and released when
//! dropped. The buffered file writer flushes on drop, so every exit path
//! leaves the data written so far on disk.

use crate::error::SinkError;
use log::debug;
use std::cell::RefCell;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// A destination for one line of text at a time.
///
/// `write_line` takes `&self` so payloads can hold a shared reference to
/// the sink and write from their constructor and destructor.
pub trait LineSink {
    fn write_line(&self, line: fmt::Arguments<'_>);

    /// Push buffered lines out, reporting the first write failure seen
    /// since the sink was opened.
    fn flush(&self) -> Result<(), SinkError>;
}

struct TextState<W> {
    writer: W,
    error: Option<io::Error>,
    lines: u64,
}

/// A [`LineSink`] over any writer.
///
/// Write errors are sticky: the first one is kept, later lines are
/// skipped, and [`LineSink::flush`] reports it.
pub struct TextSink<W: Write> {
    name: String,
    state: RefCell<TextState<W>>,
}

/// The workload trace file.
pub type LogSink = TextSink<BufWriter<File>>;

fn open_append(path: &Path) -> Result<BufWriter<File>, SinkError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("opened {} for append", path.display());
    Ok(BufWriter::new(file))
}

impl TextSink<BufWriter<File>> {
    /// Open `path` for appending, creating it if needed.
    pub fn append(path: &Path) -> Result<Self, SinkError> {
        Ok(Self::new(path.display().to_string(), open_append(path)?))
    }
}

impl<W: Write> TextSink<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            state: RefCell::new(TextState {
                writer,
                error: None,
                lines: 0,
            }),
        }
    }

    /// Lines successfully handed to the writer.
    pub fn lines_written(&self) -> u64 {
        self.state.borrow().lines
    }

    pub fn into_inner(self) -> W {
        self.state.into_inner().writer
    }
}

impl<W: Write> LineSink for TextSink<W> {
    fn write_line(&self, line: fmt::Arguments<'_>) {
        let mut state = self.state.borrow_mut();
        if state.error.is_some() {
            return;
        }
        match writeln!(state.writer, "{line}") {
            Ok(()) => state.lines += 1,
            Err(err) => state.error = Some(err),
        }
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut state = self.state.borrow_mut();
        let result = match state.error.take() {
            Some(err) => Err(err),
            None => state.writer.flush(),
        };
        result.map_err(|source| SinkError::Write {
            name: self.name.clone(),
            source,
        })
    }
}

impl<W: Write> fmt::Debug for TextSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextSink")
            .field("name", &self.name)
            .field("lines", &self.lines_written())
            .finish()
    }
}

/// One newline-terminated elapsed-milliseconds value per record. No
/// header, no schema.
pub struct ResultSink<W: Write> {
    name: String,
    writer: W,
    records: u64,
}

impl ResultSink<BufWriter<File>> {
    /// Open `path` for appending, creating it if needed.
    pub fn append(path: &Path) -> Result<Self, SinkError> {
        Ok(Self::new(path.display().to_string(), open_append(path)?))
    }
}

impl<W: Write> ResultSink<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
            records: 0,
        }
    }

    /// Append one record and flush it, so a later fatal error cannot lose
    /// measurements already taken.
    pub fn record(&mut self, millis: u128) -> Result<(), SinkError> {
        writeln!(self.writer, "{millis}")
            .and_then(|()| self.writer.flush())
            .map_err(|source| SinkError::Write {
                name: self.name.clone(),
                source,
            })?;
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> fmt::Debug for ResultSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSink")
            .field("name", &self.name)
            .field("records", &self.records)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    /// Accepts `budget` bytes, then fails every write.
    struct FailingWriter {
        budget: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_text_sink_writes_lines() {
        let sink = TextSink::new("memory", Vec::new());
        sink.write_line(format_args!("constructed {}", 27));
        sink.write_line(format_args!("dropped {}", 27));
        sink.flush().unwrap();

        assert_eq!(sink.lines_written(), 2);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "constructed 27\ndropped 27\n");
    }

    #[test]
    fn test_text_sink_error_is_sticky() {
        let sink = TextSink::new("failing", FailingWriter { budget: 4 });
        sink.write_line(format_args!("ok"));
        sink.write_line(format_args!("this one fails"));
        sink.write_line(format_args!("skipped"));

        assert_eq!(sink.lines_written(), 1);
        let err = sink.flush().unwrap_err();
        assert!(err.to_string().contains("failing"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_result_sink_one_line_per_record() {
        let mut sink = ResultSink::new("memory", Vec::new());
        sink.record(0).unwrap();
        sink.record(152).unwrap();

        assert_eq!(sink.records(), 2);
        assert_eq!(sink.into_inner(), b"0\n152\n");
    }

    #[test]
    fn test_result_sink_write_failure() {
        let mut sink = ResultSink::new("failing", FailingWriter { budget: 0 });
        assert!(matches!(sink.record(5), Err(SinkError::Write { .. })));
        assert_eq!(sink.records(), 0);
    }

    #[test]
    fn test_append_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("run.log");
        match LogSink::append(&path) {
            Err(SinkError::Open { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected open failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_append_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.txt");
        std::fs::write(&path, "10\n").unwrap();

        {
            let mut sink = ResultSink::append(&path).unwrap();
            sink.record(20).unwrap();
        }

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "10\n20\n");
    }
}
