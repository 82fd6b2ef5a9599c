//! Append-only session log read back by driver-side tests.
//!
//! One record per command:
//! ```text
//! IN: clean test.r ref=refs/heads/main 57 [OK] -- OUT: 57 . [OK]
//! IN: list_available_blobs test-delay10.a test-delay11.a [OK]
//! ```

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

use pktfilter_core::Command;

use crate::error::{log_err, FilterError};

/// Record terminator for a file request that ended without sending content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Error,
    Abort,
    Delayed,
    WriteFail,
}

impl Outcome {
    fn tag(self) -> &'static str {
        match self {
            Outcome::Error => "[ERROR]",
            Outcome::Abort => "[ABORT]",
            Outcome::Delayed => "[DELAYED]",
            Outcome::WriteFail => "[WRITE FAIL]",
        }
    }
}

#[derive(Debug)]
pub struct SessionLog {
    path: PathBuf,
    out: LineWriter<File>,
}

impl SessionLog {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> Result<Self, FilterError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| log_err(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            out: LineWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&mut self, text: &str) -> Result<(), FilterError> {
        self.out
            .write_all(text.as_bytes())
            .map_err(|e| log_err(&self.path, e))
    }

    pub fn start(&mut self) -> Result<(), FilterError> {
        self.write("START\n")
    }

    pub fn handshake_complete(&mut self) -> Result<(), FilterError> {
        self.write("init handshake complete\n")
    }

    pub fn stop(&mut self) -> Result<(), FilterError> {
        self.write("STOP\n")?;
        self.out.flush().map_err(|e| log_err(&self.path, e))
    }

    pub fn command(&mut self, command: Command) -> Result<(), FilterError> {
        self.write(&format!("IN: {command}"))
    }

    /// Append one space-separated field to the current record.
    pub fn field(&mut self, text: &str) -> Result<(), FilterError> {
        self.write(&format!(" {text}"))
    }

    pub fn available(&mut self, ready: &BTreeSet<String>) -> Result<(), FilterError> {
        for pathname in ready {
            self.field(pathname)?;
        }
        self.write(" [OK]\n")
    }

    pub fn input_read(&mut self, len: usize) -> Result<(), FilterError> {
        self.write(&format!(" {len} [OK] -- "))
    }

    pub fn outcome(&mut self, outcome: Outcome) -> Result<(), FilterError> {
        self.write(outcome.tag())?;
        self.write("\n")
    }

    pub fn output_started(&mut self, len: usize) -> Result<(), FilterError> {
        self.write(&format!("OUT: {len} "))
    }

    /// Close a successful record with one dot per packet sent.
    pub fn output_written(&mut self, packets: usize) -> Result<(), FilterError> {
        self.write(&".".repeat(packets))?;
        self.write(" [OK]\n")
    }
}
