//! Event sources
//!
//! Live capture uses the Linux proc connector; recorded streams can be
//! replayed from JSON lines on any platform.

#[cfg(target_os = "linux")]
pub mod proc_connector;
pub mod replay;

pub use replay::ReplaySource;

use shelltrace_core::{EventSource, Result};
use std::time::Duration;

/// Open the kernel event subscription for this platform
#[cfg(target_os = "linux")]
pub fn open_live(receive_timeout: Duration) -> Result<Box<dyn EventSource>> {
    Ok(Box::new(proc_connector::ProcConnectorSource::open(
        receive_timeout,
    )?))
}

#[cfg(not(target_os = "linux"))]
pub fn open_live(_receive_timeout: Duration) -> Result<Box<dyn EventSource>> {
    Err(shelltrace_core::MonitorError::Unsupported(
        "live process tracing needs the Linux proc connector; use --replay".to_string(),
    ))
}
