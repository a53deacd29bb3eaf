//! Monitoring session driver
//!
//! [`Monitor`] ties the tracker and the extractor together: it feeds each
//! event to the tracker, classifies the command line of shells that joined the
//! tree, and forwards the outcomes to a [`Reporter`].

use crate::config::MonitorConfig;
use crate::extractor::CommandLineExtractor;
use crate::source::{EventSource, SourcePoll};
use crate::tracker::ProcessTree;
use crate::types::{
    ExecOutcome, ExtractionResult, JoinOutcome, LeaveOutcome, Pid, ProcessEvent, Result,
};
use std::sync::atomic::{AtomicBool, Ordering};

/// Receives structured monitoring output
///
/// Implementations decide how results are presented; the library never
/// formats or colors anything.
pub trait Reporter {
    fn on_child_joined(&mut self, pid: Pid, parent_pid: Pid, process_name: &str);

    fn on_child_left(&mut self, pid: Pid, process_name: &str, exit_status: i32);

    /// Called for shells only; `NotApplicable` results are not forwarded
    fn on_command_classified(&mut self, pid: Pid, result: &ExtractionResult);
}

/// Counters for one monitoring session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub events: u64,
    pub joined: u64,
    pub left: u64,
    pub member_execs: u64,
    pub ignored: u64,
    pub classified: u64,
}

/// A monitoring session: membership state plus command classification
pub struct Monitor {
    tree: ProcessTree,
    extractor: CommandLineExtractor,
    stats: MonitorStats,
}

impl Monitor {
    /// Create a session rooted at `config.root_pid`
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tree: ProcessTree::new(config.root_pid),
            extractor: CommandLineExtractor::new(&config.extractor)?,
            stats: MonitorStats::default(),
        })
    }

    /// Process a single event
    pub fn handle(&mut self, event: &ProcessEvent, reporter: &mut dyn Reporter) {
        self.stats.events += 1;

        match event {
            ProcessEvent::Start(start) => match self.tree.on_start(start) {
                JoinOutcome::Joined {
                    pid,
                    parent_pid,
                    process_name,
                } => {
                    self.stats.joined += 1;
                    reporter.on_child_joined(pid, parent_pid, &process_name);
                    self.classify(pid, &start.image_file_name, &start.command_line, reporter);
                }
                JoinOutcome::Ignored => self.stats.ignored += 1,
            },
            ProcessEvent::Stop(stop) => match self.tree.on_stop(stop) {
                LeaveOutcome::Left {
                    pid,
                    process_name,
                    exit_status,
                } => {
                    self.stats.left += 1;
                    reporter.on_child_left(pid, &process_name, exit_status);
                }
                LeaveOutcome::Ignored => self.stats.ignored += 1,
            },
            ProcessEvent::Exec(exec) => match self.tree.on_exec(exec) {
                ExecOutcome::Member { pid } => {
                    self.stats.member_execs += 1;
                    self.classify(pid, &exec.image_file_name, &exec.command_line, reporter);
                }
                ExecOutcome::Ignored => self.stats.ignored += 1,
            },
        }
    }

    fn classify(
        &mut self,
        pid: Pid,
        image_file_name: &str,
        command_line: &str,
        reporter: &mut dyn Reporter,
    ) {
        let result = self.extractor.extract(image_file_name, command_line);
        if result.is_applicable() {
            self.stats.classified += 1;
            reporter.on_command_classified(pid, &result);
        } else {
            log::trace!("PID {} image {:?} is not a shell", pid, image_file_name);
        }
    }

    /// Drain a source until it closes or `stop` is set
    ///
    /// The flag is checked between polls, so a source that returns
    /// [`SourcePoll::Idle`] on timeout lets the session end promptly.
    pub fn run(
        &mut self,
        source: &mut dyn EventSource,
        reporter: &mut dyn Reporter,
        stop: &AtomicBool,
    ) -> Result<MonitorStats> {
        log::info!("Monitoring process tree of root PID {}", self.tree.root());

        while !stop.load(Ordering::SeqCst) {
            match source.poll()? {
                SourcePoll::Event(event) => self.handle(&event, reporter),
                SourcePoll::Idle => continue,
                SourcePoll::Closed => {
                    log::info!("Event source closed");
                    break;
                }
            }
        }

        Ok(self.stats)
    }

    pub fn tree(&self) -> &ProcessTree {
        &self.tree
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::VecSource;
    use crate::types::{ExecEvent, StartEvent, StopEvent};

    #[derive(Default)]
    struct Recorder {
        lines: Vec<String>,
    }

    impl Reporter for Recorder {
        fn on_child_joined(&mut self, pid: Pid, parent_pid: Pid, process_name: &str) {
            self.lines.push(format!("joined {} {} {}", pid, parent_pid, process_name));
        }

        fn on_child_left(&mut self, pid: Pid, process_name: &str, exit_status: i32) {
            self.lines.push(format!("left {} {} {}", pid, process_name, exit_status));
        }

        fn on_command_classified(&mut self, pid: Pid, result: &ExtractionResult) {
            self.lines.push(format!("command {} {}", pid, result));
        }
    }

    fn monitor() -> Monitor {
        Monitor::new(&MonitorConfig::new(10).with_shell_executable("bash.exe")).unwrap()
    }

    #[test]
    fn test_shell_child_is_classified() {
        let mut monitor = monitor();
        let mut recorder = Recorder::default();

        monitor.handle(
            &StartEvent {
                pid: 11,
                parent_pid: 10,
                image_file_name: "bash.exe".into(),
                command_line: "bash.exe -lc \"echo hi\"".into(),
                process_name: "bash".into(),
            }
            .into(),
            &mut recorder,
        );

        assert_eq!(
            recorder.lines,
            vec!["joined 11 10 bash", "command 11 shell_invocation: echo hi"]
        );
        assert_eq!(monitor.stats().classified, 1);
    }

    #[test]
    fn test_non_shell_child_not_classified() {
        let mut monitor = monitor();
        let mut recorder = Recorder::default();

        monitor.handle(
            &StartEvent {
                pid: 11,
                parent_pid: 10,
                image_file_name: "notepad.exe".into(),
                command_line: "notepad.exe -c 'x'".into(),
                process_name: "notepad".into(),
            }
            .into(),
            &mut recorder,
        );

        assert_eq!(recorder.lines, vec!["joined 11 10 notepad"]);
    }

    #[test]
    fn test_untracked_shell_not_classified() {
        let mut monitor = monitor();
        let mut recorder = Recorder::default();

        monitor.handle(
            &StartEvent {
                pid: 50,
                parent_pid: 1,
                image_file_name: "bash.exe".into(),
                command_line: "bash.exe -c 'ls'".into(),
                process_name: "bash".into(),
            }
            .into(),
            &mut recorder,
        );

        assert!(recorder.lines.is_empty());
        assert_eq!(monitor.stats().ignored, 1);
    }

    #[test]
    fn test_exec_of_member_is_classified() {
        let mut monitor = monitor();
        let mut recorder = Recorder::default();

        monitor.handle(
            &StartEvent {
                pid: 11,
                parent_pid: 10,
                image_file_name: String::new(),
                command_line: String::new(),
                process_name: "node".into(),
            }
            .into(),
            &mut recorder,
        );
        monitor.handle(
            &ExecEvent {
                pid: 11,
                image_file_name: "/usr/bin/bash.exe".into(),
                command_line: "bash.exe".into(),
                process_name: "bash".into(),
            }
            .into(),
            &mut recorder,
        );

        assert_eq!(
            recorder.lines,
            vec!["joined 11 10 node", "command 11 raw_exec: bash.exe"]
        );
        assert_eq!(monitor.stats().member_execs, 1);
    }

    #[test]
    fn test_run_drains_source_and_counts() {
        let mut monitor = monitor();
        let mut recorder = Recorder::default();
        let events: Vec<ProcessEvent> = vec![
            StartEvent {
                pid: 11,
                parent_pid: 10,
                image_file_name: String::new(),
                command_line: String::new(),
                process_name: "make".into(),
            }
            .into(),
            StopEvent {
                pid: 11,
                process_name: "make".into(),
                exit_status: 1,
            }
            .into(),
            StopEvent {
                pid: 99,
                process_name: "other".into(),
                exit_status: 0,
            }
            .into(),
        ];
        let mut source = VecSource::new(events);

        let stats = monitor
            .run(&mut source, &mut recorder, &AtomicBool::new(false))
            .unwrap();

        assert_eq!(stats.events, 3);
        assert_eq!(stats.joined, 1);
        assert_eq!(stats.left, 1);
        assert_eq!(stats.ignored, 1);
        assert_eq!(recorder.lines, vec!["joined 11 10 make", "left 11 make 1"]);
        assert_eq!(monitor.tree().members(), vec![10]);
    }

    #[test]
    fn test_run_stops_when_flag_set() {
        let mut monitor = monitor();
        let mut recorder = Recorder::default();
        let mut source = VecSource::new(vec![ProcessEvent::Stop(StopEvent {
            pid: 10,
            process_name: "root".into(),
            exit_status: 0,
        })]);

        let stats = monitor
            .run(&mut source, &mut recorder, &AtomicBool::new(true))
            .unwrap();

        assert_eq!(stats.events, 0);
        assert!(monitor.tree().contains(10));
    }
}
