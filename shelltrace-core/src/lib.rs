//! shelltrace core library
//!
//! Tracks the live descendant set of a root process from a stream of process
//! lifecycle events, and recovers the user's command from shell command lines
//! that wrap it (`bash -c "..."`, snapshot replay with `eval '...'`).
//!
//! # Architecture
//!
//! The library is intentionally small:
//! - [`ProcessTree`] decides membership from start/stop records
//! - [`CommandLineExtractor`] classifies shell command lines (pure)
//! - [`Monitor`] feeds events through both and calls a [`Reporter`]
//!
//! The library does NOT:
//! - Open kernel tracing sessions
//! - Check privileges
//! - Print or color anything
//!
//! Those belong to the application layer (shelltrace-cli), which plugs in
//! through the [`EventSource`] and [`Reporter`] traits.
//!
//! # Example Usage
//!
//! ```
//! use shelltrace_core::{Monitor, MonitorConfig, Reporter, ExtractionResult, Pid, StartEvent};
//!
//! struct Print;
//!
//! impl Reporter for Print {
//!     fn on_child_joined(&mut self, pid: Pid, parent: Pid, name: &str) {
//!         println!("{} joined under {} ({})", pid, parent, name);
//!     }
//!     fn on_child_left(&mut self, pid: Pid, name: &str, status: i32) {
//!         println!("{} ({}) exited with {}", pid, name, status);
//!     }
//!     fn on_command_classified(&mut self, pid: Pid, result: &ExtractionResult) {
//!         println!("{}: {}", pid, result);
//!     }
//! }
//!
//! let config = MonitorConfig::new(1000).with_shell_executable("bash.exe");
//! let mut monitor = Monitor::new(&config).unwrap();
//!
//! let event = StartEvent {
//!     pid: 1001,
//!     parent_pid: 1000,
//!     image_file_name: "bash.exe".to_string(),
//!     command_line: "bash.exe -c 'cargo build'".to_string(),
//!     process_name: "bash".to_string(),
//! };
//! monitor.handle(&event.into(), &mut Print);
//! assert!(monitor.tree().contains(1001));
//! ```

// Public modules
pub mod config;
pub mod extractor;
pub mod monitor;
pub mod source;
pub mod tracker;
pub mod types;

// Re-export main types for convenience
pub use config::{ExtractorConfig, MonitorConfig, DEFAULT_SHELL_EXECUTABLE};
pub use extractor::CommandLineExtractor;
pub use monitor::{Monitor, MonitorStats, Reporter};
pub use source::{EventSource, SourcePoll, VecSource};
pub use tracker::ProcessTree;
pub use types::{
    ExecEvent, ExecOutcome, ExtractionResult, JoinOutcome, LeaveOutcome, MonitorError, Pid,
    ProcessEvent, Result, StartEvent, StopEvent,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: a fresh monitor tracks only its root
        let monitor = Monitor::new(&MonitorConfig::new(1)).unwrap();
        assert_eq!(monitor.tree().members(), vec![1]);
        assert_eq!(monitor.stats(), MonitorStats::default());
    }
}
