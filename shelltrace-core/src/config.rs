//! Monitoring configuration types
//!
//! This module defines the minimal configuration needed by the library: which
//! process is the root of the monitored tree and which executable counts as the
//! shell whose command lines are classified. Anything about presentation or
//! event capture belongs to the application layer.

use crate::types::{MonitorError, Pid, Result};
use serde::{Deserialize, Serialize};

/// Shell executable name matched against the end of image file names
#[cfg(windows)]
pub const DEFAULT_SHELL_EXECUTABLE: &str = "bash.exe";
#[cfg(not(windows))]
pub const DEFAULT_SHELL_EXECUTABLE: &str = "bash";

/// Configuration for the command line extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Image names ending with this (case-insensitive) are classified
    #[serde(default = "default_shell_executable")]
    pub shell_executable: String,
}

fn default_shell_executable() -> String {
    DEFAULT_SHELL_EXECUTABLE.to_string()
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            shell_executable: default_shell_executable(),
        }
    }
}

impl ExtractorConfig {
    /// Create a new extractor configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the shell executable name
    pub fn with_shell_executable(mut self, name: impl Into<String>) -> Self {
        self.shell_executable = name.into();
        self
    }

    /// Reject configurations the extractor cannot work with
    ///
    /// An empty executable name would match every image.
    pub fn validate(&self) -> Result<()> {
        if self.shell_executable.trim().is_empty() {
            return Err(MonitorError::InvalidConfig(
                "shell executable name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for a monitoring session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Process whose descendants are tracked
    pub root_pid: Pid,

    #[serde(default)]
    pub extractor: ExtractorConfig,
}

impl MonitorConfig {
    /// Create a configuration for the given root process
    pub fn new(root_pid: Pid) -> Self {
        Self {
            root_pid,
            extractor: ExtractorConfig::default(),
        }
    }

    /// Builder method: replace the extractor configuration
    pub fn with_extractor(mut self, extractor: ExtractorConfig) -> Self {
        self.extractor = extractor;
        self
    }

    /// Builder method: set the shell executable name
    pub fn with_shell_executable(mut self, name: impl Into<String>) -> Self {
        self.extractor.shell_executable = name.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.extractor.validate()
    }
}
