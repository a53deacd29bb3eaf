//! Process tree membership tracking
//!
//! The tracker owns the set of PIDs that belong to the monitored tree. A PID
//! joins when a start event names a member as its parent and leaves on its own
//! stop event. Events outside the tree are expected (the kernel reports every
//! process on the system, and delivery may be reordered) and are ignored
//! without error.

use crate::types::{ExecEvent, ExecOutcome, JoinOutcome, LeaveOutcome, Pid, StartEvent, StopEvent};
use std::collections::HashSet;

/// Membership state for one monitoring session
#[derive(Debug, Clone)]
pub struct ProcessTree {
    root: Pid,
    members: HashSet<Pid>,
}

impl ProcessTree {
    /// Create a tree containing only the root process
    pub fn new(root: Pid) -> Self {
        let mut members = HashSet::new();
        members.insert(root);
        Self { root, members }
    }

    /// Handle a process creation
    pub fn on_start(&mut self, event: &StartEvent) -> JoinOutcome {
        if !self.members.contains(&event.parent_pid) {
            log::trace!(
                "Ignoring start of PID {}: parent {} not monitored",
                event.pid,
                event.parent_pid
            );
            return JoinOutcome::Ignored;
        }

        if !self.members.insert(event.pid) {
            log::trace!("Ignoring duplicate start of PID {}", event.pid);
            return JoinOutcome::Ignored;
        }

        log::debug!(
            "PID {} ({}) joined under parent {}",
            event.pid,
            event.process_name,
            event.parent_pid
        );
        JoinOutcome::Joined {
            pid: event.pid,
            parent_pid: event.parent_pid,
            process_name: event.process_name.clone(),
        }
    }

    /// Handle a process termination
    pub fn on_stop(&mut self, event: &StopEvent) -> LeaveOutcome {
        if !self.members.remove(&event.pid) {
            log::trace!("Ignoring stop of untracked PID {}", event.pid);
            return LeaveOutcome::Ignored;
        }

        log::debug!(
            "PID {} ({}) left with status {}",
            event.pid,
            event.process_name,
            event.exit_status
        );
        LeaveOutcome::Left {
            pid: event.pid,
            process_name: event.process_name.clone(),
            exit_status: event.exit_status,
        }
    }

    /// Handle an image replacement; membership never changes
    pub fn on_exec(&self, event: &ExecEvent) -> ExecOutcome {
        if self.members.contains(&event.pid) {
            ExecOutcome::Member { pid: event.pid }
        } else {
            ExecOutcome::Ignored
        }
    }

    /// The configured root PID (may have left the tree already)
    pub fn root(&self) -> Pid {
        self.root
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.members.contains(&pid)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Current members in ascending order
    pub fn members(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self.members.iter().copied().collect();
        pids.sort_unstable();
        pids
    }
}
