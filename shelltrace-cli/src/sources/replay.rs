//! Replay of recorded event streams
//!
//! Reads one JSON encoded `ProcessEvent` per line, e.g.
//!
//! ```text
//! {"type":"start","pid":11,"parent_pid":10,"image_file_name":"bash.exe","command_line":"bash.exe -c 'ls'","process_name":"bash"}
//! {"type":"stop","pid":11,"process_name":"bash","exit_status":0}
//! ```
//!
//! Blank lines are skipped. The source closes at end of input.

use shelltrace_core::{EventSource, MonitorError, ProcessEvent, Result, SourcePoll};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub struct ReplaySource<R: BufRead> {
    reader: R,
    line: String,
    line_number: usize,
}

impl ReplaySource<BufReader<File>> {
    /// Open a recorded event file
    pub fn open(path: &Path) -> Result<Self> {
        log::info!("Replaying events from {:?}", path);
        Ok(Self::from_reader(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> EventSource for ReplaySource<R> {
    fn poll(&mut self) -> Result<SourcePoll> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(SourcePoll::Closed);
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let event: ProcessEvent = serde_json::from_str(trimmed).map_err(|e| {
                MonitorError::EventDecode(format!("line {}: {}", self.line_number, e))
            })?;
            return Ok(SourcePoll::Event(event));
        }
    }
}
