//! Live process events from the Linux netlink proc connector
//!
//! Subscribing requires CAP_NET_ADMIN (in practice: root). The kernel reports
//! fork, exec and exit for every task on the system; threads are filtered out
//! here and everything else is left to the tracker.
//!
//! Fork is reported as a start event without image or command line, because
//! the child still runs its parent's image at that point. The image and the
//! command line arrive with the following exec.
//!
//! `PidMonitor::recv` blocks without a timeout, so a reader thread owns the
//! subscription and hands events over a bounded channel. Polling waits on the
//! channel for at most the configured receive timeout.

use cnproc::{PidEvent, PidMonitor};
use procfs::process::Process;
use shelltrace_core::{
    EventSource, ExecEvent, Pid, ProcessEvent, Result, SourcePoll, StartEvent, StopEvent,
};
use std::collections::HashMap;
use std::io;
use std::mem;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::Duration;

/// Events buffered between the reader thread and the monitor
const EVENT_QUEUE_LEN: usize = 1024;

/// Consecutive empty reads before the reader gives up on the socket
const MAX_EMPTY_READS: u32 = 64;

/// Cached names above this count trigger a sweep of dead PIDs
const NAME_CACHE_LIMIT: usize = 4096;

/// Process notification reduced to the fields the tracker needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KernelEvent {
    Fork {
        parent_tgid: u32,
        child_pid: u32,
        child_tgid: u32,
    },
    Exec {
        pid: u32,
        tgid: u32,
    },
    Exit {
        pid: u32,
        tgid: u32,
        exit_code: u32,
    },
}

impl KernelEvent {
    fn from_pid_event(event: PidEvent) -> Option<Self> {
        match event {
            PidEvent::Fork {
                child_pid,
                child_tgid,
                parent_tgid,
                ..
            } => Some(KernelEvent::Fork {
                parent_tgid: parent_tgid as u32,
                child_pid: child_pid as u32,
                child_tgid: child_tgid as u32,
            }),
            PidEvent::Exec {
                process_pid,
                process_tgid,
            } => Some(KernelEvent::Exec {
                pid: process_pid as u32,
                tgid: process_tgid as u32,
            }),
            PidEvent::Exit {
                process_pid,
                process_tgid,
                exit_code,
                ..
            } => Some(KernelEvent::Exit {
                pid: process_pid as u32,
                tgid: process_tgid as u32,
                exit_code: exit_code as u32,
            }),
            PidEvent::Coredump { .. } => None,
        }
    }
}

/// Shell style exit status from a kernel wait status
pub(crate) fn exit_status(raw: u32) -> i32 {
    let signal = raw & 0x7f;
    if signal == 0 {
        ((raw >> 8) & 0xff) as i32
    } else {
        128 + signal as i32
    }
}

/// `-c`, `-lc`, `-xc`, ...: a short option cluster that takes a command string
fn is_command_flag(arg: &str) -> bool {
    match arg.strip_prefix('-') {
        Some(flags) => {
            !flags.is_empty()
                && flags.chars().all(|c| c.is_ascii_alphabetic())
                && flags.contains('c')
        }
        None => false,
    }
}

/// Wrap an argument in the quote character that keeps most of it intact
///
/// Double quotes unless the argument contains one, then single quotes. When
/// both kinds occur, the wrapper is the one whose first inner occurrence comes
/// later, since a quoted span always ends at the first matching quote.
fn quote(arg: &str) -> String {
    let wrapper = match (arg.find('"'), arg.find('\'')) {
        (None, _) => '"',
        (Some(_), None) => '\'',
        (Some(double), Some(single)) if double > single => '"',
        _ => '\'',
    };
    format!("{wrapper}{arg}{wrapper}")
}

/// Rebuild a single command line from argv
///
/// The argument after a command option cluster is always quoted so that
/// `bash -c pwd` reads as `bash -c "pwd"`. Other arguments are quoted only
/// when they are empty or contain whitespace or quotes.
pub(crate) fn join_command_line(args: &[String]) -> String {
    let mut after_command_flag = false;
    args.iter()
        .map(|arg| {
            let force = mem::replace(&mut after_command_flag, is_command_flag(arg));
            let needs_quotes = force
                || arg.is_empty()
                || arg.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'');
            if needs_quotes {
                quote(arg)
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Snapshot of a process read from /proc
struct ProcInfo {
    image_file_name: String,
    command_line: String,
    process_name: Option<String>,
}

fn read_proc(pid: Pid) -> ProcInfo {
    let process = match Process::new(pid as i32) {
        Ok(process) => process,
        Err(e) => {
            log::trace!("PID {} vanished before /proc lookup: {}", pid, e);
            return ProcInfo {
                image_file_name: String::new(),
                command_line: String::new(),
                process_name: None,
            };
        }
    };

    ProcInfo {
        image_file_name: process
            .exe()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        command_line: process
            .cmdline()
            .map(|args| join_command_line(&args))
            .unwrap_or_default(),
        process_name: read_comm(&process),
    }
}

fn read_comm(process: &Process) -> Option<String> {
    process.stat().ok().map(|stat| stat.comm)
}

fn is_alive(pid: Pid) -> bool {
    Process::new(pid as i32).is_ok()
}

/// Drop cached names of processes that are gone
///
/// Exit notifications can be lost when the kernel overruns the socket buffer,
/// so the cache is swept instead of relying on exits alone.
fn prune_names(names: &mut HashMap<Pid, String>, alive: impl Fn(Pid) -> bool) {
    let before = names.len();
    names.retain(|pid, _| alive(*pid));
    log::debug!(
        "Pruned {} stale process names, {} remain",
        before - names.len(),
        names.len()
    );
}

/// Body of the reader thread
fn forward_events(mut monitor: PidMonitor, tx: SyncSender<KernelEvent>) {
    let mut empty_reads = 0;
    loop {
        match monitor.recv() {
            Some(event) => {
                empty_reads = 0;
                let Some(event) = KernelEvent::from_pid_event(event) else {
                    continue;
                };
                if tx.send(event).is_err() {
                    break; // monitor side is gone
                }
            }
            // acks and failed reads both come back empty
            None => {
                empty_reads += 1;
                if empty_reads >= MAX_EMPTY_READS {
                    log::warn!("Proc connector socket stopped delivering events");
                    break;
                }
            }
        }
    }
    log::debug!("Proc connector reader finished");
}

/// Subscription to the kernel proc connector
///
/// The reader thread releases the subscription once this value is dropped and
/// the next kernel notification finds the channel closed.
pub struct ProcConnectorSource {
    rx: Receiver<KernelEvent>,
    receive_timeout: Duration,
    /// Last known name per PID; exit notifications may outlive /proc entries
    names: HashMap<Pid, String>,
}

impl ProcConnectorSource {
    /// Subscribe to process events and start the reader thread
    pub fn open(receive_timeout: Duration) -> Result<Self> {
        let monitor = PidMonitor::new()?;
        let (tx, rx) = mpsc::sync_channel(EVENT_QUEUE_LEN);

        thread::Builder::new()
            .name("proc-connector".to_string())
            .spawn(move || forward_events(monitor, tx))?;

        log::info!("Subscribed to kernel process events");
        Ok(Self::from_receiver(rx, receive_timeout))
    }

    fn from_receiver(rx: Receiver<KernelEvent>, receive_timeout: Duration) -> Self {
        Self {
            rx,
            receive_timeout,
            names: HashMap::new(),
        }
    }

    fn remember(&mut self, pid: Pid, name: String) {
        if self.names.len() >= NAME_CACHE_LIMIT && !self.names.contains_key(&pid) {
            prune_names(&mut self.names, is_alive);
        }
        self.names.insert(pid, name);
    }

    fn name_of(&self, pid: Pid, fallback: Option<String>) -> String {
        fallback
            .or_else(|| self.names.get(&pid).cloned())
            .unwrap_or_else(|| "<unknown>".to_string())
    }

    fn translate(&mut self, event: KernelEvent) -> Option<ProcessEvent> {
        match event {
            KernelEvent::Fork {
                parent_tgid,
                child_pid,
                child_tgid,
            } => {
                if child_pid != child_tgid {
                    return None; // new thread
                }
                // a fresh child carries its parent's name until it execs
                let process_name = match self.names.get(&parent_tgid) {
                    Some(name) => name.clone(),
                    None => {
                        let comm = Process::new(child_tgid as i32)
                            .ok()
                            .and_then(|p| read_comm(&p));
                        self.name_of(parent_tgid, comm)
                    }
                };
                self.remember(child_tgid, process_name.clone());
                Some(ProcessEvent::Start(StartEvent {
                    pid: child_tgid,
                    parent_pid: parent_tgid,
                    image_file_name: String::new(),
                    command_line: String::new(),
                    process_name,
                }))
            }
            KernelEvent::Exec { pid, tgid } => {
                if pid != tgid {
                    return None;
                }
                let info = read_proc(tgid);
                let process_name = self.name_of(tgid, info.process_name);
                self.remember(tgid, process_name.clone());
                Some(ProcessEvent::Exec(ExecEvent {
                    pid: tgid,
                    image_file_name: info.image_file_name,
                    command_line: info.command_line,
                    process_name,
                }))
            }
            KernelEvent::Exit {
                pid,
                tgid,
                exit_code,
            } => {
                if pid != tgid {
                    return None; // thread exit
                }
                let process_name = match self.names.remove(&tgid) {
                    Some(name) => name,
                    None => self.name_of(tgid, read_proc(tgid).process_name),
                };
                Some(ProcessEvent::Stop(StopEvent {
                    pid: tgid,
                    process_name,
                    exit_status: exit_status(exit_code),
                }))
            }
        }
    }
}

impl EventSource for ProcConnectorSource {
    fn poll(&mut self) -> Result<SourcePoll> {
        let kernel_event = match self.rx.recv_timeout(self.receive_timeout) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => return Ok(SourcePoll::Idle),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "proc connector subscription ended unexpectedly",
                )
                .into())
            }
        };

        Ok(match self.translate(kernel_event) {
            Some(event) => SourcePoll::Event(event),
            None => SourcePoll::Idle,
        })
    }
}

impl Drop for ProcConnectorSource {
    fn drop(&mut self) {
        log::info!("Kernel process event subscription closed");
    }
}
