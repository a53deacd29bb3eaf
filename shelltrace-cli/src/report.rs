//! Console reporters
//!
//! Both reporters write one line per callback. Text output is meant for
//! people, JSON output for piping into other tools.

use crate::config::OutputFormat;
use chrono::Local;
use serde_json::json;
use shelltrace_core::{ExtractionResult, Pid, Reporter};
use std::io::{self, Write};

/// Build the reporter for the selected format, writing to stdout
pub fn stdout_reporter(format: OutputFormat) -> Box<dyn Reporter> {
    match format {
        OutputFormat::Text => Box::new(TextReporter::new(io::stdout())),
        OutputFormat::Json => Box::new(JsonReporter::new(io::stdout())),
    }
}

fn emit<W: Write>(out: &mut W, line: std::fmt::Arguments<'_>) {
    if let Err(e) = out.write_fmt(line).and_then(|_| out.flush()) {
        log::warn!("Failed to write report line: {}", e);
    }
}

/// Human readable lines
pub struct TextReporter<W: Write> {
    out: W,
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn on_child_joined(&mut self, pid: Pid, parent_pid: Pid, process_name: &str) {
        emit(
            &mut self.out,
            format_args!(
                "[started] pid={} parent={} name={}\n",
                pid, parent_pid, process_name
            ),
        );
    }

    fn on_child_left(&mut self, pid: Pid, process_name: &str, exit_status: i32) {
        emit(
            &mut self.out,
            format_args!(
                "[exited]  pid={} name={} status={}\n",
                pid, process_name, exit_status
            ),
        );
    }

    fn on_command_classified(&mut self, pid: Pid, result: &ExtractionResult) {
        let label = match result {
            ExtractionResult::ShellInvocation(_) => "SHELL CMD",
            ExtractionResult::SnapshotEval(_) => "EVAL CMD",
            ExtractionResult::SnapshotHint(_) => "SNAPSHOT",
            ExtractionResult::RawExec(_) => "RAW EXEC",
            ExtractionResult::NotApplicable => return,
        };
        emit(
            &mut self.out,
            format_args!(
                "  -> [{}] pid={} cmd={}\n",
                label,
                pid,
                result.text().unwrap_or_default()
            ),
        );
    }
}

/// One JSON object per line
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_value(&mut self, value: serde_json::Value) {
        emit(&mut self.out, format_args!("{}\n", value));
    }
}

fn timestamp() -> String {
    Local::now().to_rfc3339()
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn on_child_joined(&mut self, pid: Pid, parent_pid: Pid, process_name: &str) {
        self.write_value(json!({
            "timestamp": timestamp(),
            "event": "joined",
            "pid": pid,
            "parent_pid": parent_pid,
            "process_name": process_name,
        }));
    }

    fn on_child_left(&mut self, pid: Pid, process_name: &str, exit_status: i32) {
        self.write_value(json!({
            "timestamp": timestamp(),
            "event": "left",
            "pid": pid,
            "process_name": process_name,
            "exit_status": exit_status,
        }));
    }

    fn on_command_classified(&mut self, pid: Pid, result: &ExtractionResult) {
        self.write_value(json!({
            "timestamp": timestamp(),
            "event": "command",
            "pid": pid,
            "classification": result,
        }));
    }
}
