//! Record writer owning the dispatcher's stdout.
//!
//! Guarantees one line per record, a flush after every line and at most one
//! terminal record. Anything written after the terminal record is dropped.

use std::io::{self, Write};

use kartoshka_core::{FailureKind, Record, TerminalRecord};

/// Error text used when a command returns without reporting a result.
pub const MISSING_RESULT: &str = "Dispatcher finished without reporting a result";

pub struct RecordWriter<W: Write> {
    out: W,
    /// `Some(success)` once the terminal record has been written.
    terminal: Option<bool>,
    dropped: usize,
}

impl<W: Write> RecordWriter<W> {
    pub const fn new(out: W) -> Self {
        Self {
            out,
            terminal: None,
            dropped: 0,
        }
    }

    /// Write one record. Records after the terminal one are dropped.
    pub fn write(&mut self, record: &Record) -> io::Result<()> {
        if self.terminal.is_some() {
            self.dropped += 1;
            tracing::warn!(?record, "Dropping record written after the terminal record");
            return Ok(());
        }

        let line = record.to_line().map_err(io::Error::other)?;
        self.write_line(&line)?;

        if let Record::Outcome(outcome) = record {
            self.terminal = Some(outcome.is_success());
        } else if record.is_terminal() {
            self.terminal = Some(true);
        }
        Ok(())
    }

    pub fn failure(&mut self, kind: FailureKind, error: impl Into<String>) -> io::Result<()> {
        self.write(&Record::Outcome(TerminalRecord::failure(kind, error)))
    }

    /// Forward free-form tool output as diagnostic lines.
    pub fn diagnostic(&mut self, text: &str) -> io::Result<()> {
        if self.terminal.is_some() {
            self.dropped += 1;
            return Ok(());
        }
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            self.write_line(line)?;
        }
        Ok(())
    }

    pub const fn terminal(&self) -> Option<bool> {
        self.terminal
    }

    pub const fn dropped(&self) -> usize {
        self.dropped
    }

    /// Close the stream, writing a fault record if no terminal record was
    /// written. Returns whether the invocation succeeded.
    pub fn finish(&mut self) -> io::Result<bool> {
        if self.terminal.is_none() {
            tracing::error!("Command returned without a terminal record");
            self.failure(FailureKind::Fault, MISSING_RESULT)?;
        }
        self.out.flush()?;
        Ok(self.terminal == Some(true))
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}
