//! Core types for the shelltrace library
//!
//! This module defines the events the tracker consumes, the outcomes it emits,
//! and the classification results produced by the command line extractor.
//! None of these types own resources; they are plain values handed between the
//! event source, the tracker and the reporter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system process identifier
pub type Pid = u32;

/// Result type for monitoring operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors that can occur while setting up or driving a monitoring session
///
/// The tracker and the extractor are total and never produce these; only
/// configuration and event sources can fail.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to decode event: {0}")]
    EventDecode(String),

    #[error("Event source is not supported on this platform: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A process creation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartEvent {
    pub pid: Pid,
    pub parent_pid: Pid,
    /// Path or file name of the executable image (may be empty)
    #[serde(default)]
    pub image_file_name: String,
    /// Full command line as seen by the OS (may be empty)
    #[serde(default)]
    pub command_line: String,
    pub process_name: String,
}

/// A process termination record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopEvent {
    pub pid: Pid,
    pub process_name: String,
    pub exit_status: i32,
}

/// An image replacement record for an already existing process
///
/// Emitted by sources where creation and image loading are separate kernel
/// notifications (fork then exec).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecEvent {
    pub pid: Pid,
    #[serde(default)]
    pub image_file_name: String,
    #[serde(default)]
    pub command_line: String,
    pub process_name: String,
}

/// A single record from the event source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProcessEvent {
    Start(StartEvent),
    Stop(StopEvent),
    Exec(ExecEvent),
}

impl ProcessEvent {
    /// PID the event is about
    pub fn pid(&self) -> Pid {
        match self {
            ProcessEvent::Start(e) => e.pid,
            ProcessEvent::Stop(e) => e.pid,
            ProcessEvent::Exec(e) => e.pid,
        }
    }

    /// Process name carried by the event
    pub fn process_name(&self) -> &str {
        match self {
            ProcessEvent::Start(e) => &e.process_name,
            ProcessEvent::Stop(e) => &e.process_name,
            ProcessEvent::Exec(e) => &e.process_name,
        }
    }
}

impl From<StartEvent> for ProcessEvent {
    fn from(event: StartEvent) -> Self {
        ProcessEvent::Start(event)
    }
}

impl From<StopEvent> for ProcessEvent {
    fn from(event: StopEvent) -> Self {
        ProcessEvent::Stop(event)
    }
}

impl From<ExecEvent> for ProcessEvent {
    fn from(event: ExecEvent) -> Self {
        ProcessEvent::Exec(event)
    }
}

/// Result of feeding a start event to the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The process joined the monitored tree
    Joined {
        pid: Pid,
        parent_pid: Pid,
        process_name: String,
    },
    /// Parent not monitored, or the PID is already a member
    Ignored,
}

/// Result of feeding a stop event to the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The process left the monitored tree
    Left {
        pid: Pid,
        process_name: String,
        exit_status: i32,
    },
    /// The PID was not a member
    Ignored,
}

/// Result of feeding an exec event to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// A member replaced its image
    Member { pid: Pid },
    /// The PID was not a member
    Ignored,
}

/// Classification of a shell process command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExtractionResult {
    /// Command recovered from a direct `-c` style invocation
    ShellInvocation(String),
    /// Command recovered from an `eval` inside a snapshot replay
    SnapshotEval(String),
    /// Snapshot replay without a recognizable `eval`; full command line
    SnapshotHint(String),
    /// Shell started without any known indirection; full command line
    RawExec(String),
    /// Image is not the configured shell
    NotApplicable,
}

impl ExtractionResult {
    /// Short label for the classification kind
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionResult::ShellInvocation(_) => "shell_invocation",
            ExtractionResult::SnapshotEval(_) => "snapshot_eval",
            ExtractionResult::SnapshotHint(_) => "snapshot_hint",
            ExtractionResult::RawExec(_) => "raw_exec",
            ExtractionResult::NotApplicable => "not_applicable",
        }
    }

    /// The extracted command, or the raw command line for the fallback kinds
    pub fn text(&self) -> Option<&str> {
        match self {
            ExtractionResult::ShellInvocation(s)
            | ExtractionResult::SnapshotEval(s)
            | ExtractionResult::SnapshotHint(s)
            | ExtractionResult::RawExec(s) => Some(s),
            ExtractionResult::NotApplicable => None,
        }
    }

    /// True when the image matched the shell guard
    pub fn is_applicable(&self) -> bool {
        !matches!(self, ExtractionResult::NotApplicable)
    }
}

impl fmt::Display for ExtractionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text() {
            Some(text) => write!(f, "{}: {}", self.kind(), text),
            None => write!(f, "{}", self.kind()),
        }
    }
}
