//! Shell command line extraction
//!
//! Shells are often started indirectly: wrapped in `-c "<command>"`, or
//! replaying a cached snapshot script that `eval`s the real command. The
//! extractor recovers the user's command from the OS-visible command line with
//! an ordered cascade of rules. The first rule that matches decides the result;
//! when none do, the raw command line is reported.
//!
//! Quoted strings follow one rule throughout: an opening `'` or `"`, at least
//! one character matched non-greedily (newlines included), and a closing
//! delimiter identical to the opening one. An escaped quote inside the payload
//! is not special; the first literal closing quote ends the match.

use crate::config::ExtractorConfig;
use crate::types::{ExtractionResult, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// `-c`, `-lc`, `-ic`, ... followed by a quoted command
static DIRECT_FLAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|\s)-[A-Za-z]*c[A-Za-z]*\s+(?:'(?s:(.+?))'|"(?s:(.+?))")"#)
        .expect("direct flag pattern is valid")
});

/// `<sep>.<hidden>[<sep>segments]<sep>shell-snapshots<sep>snapshot-bash-`
///
/// `.` and `..` are not hidden directories.
static SNAPSHOT_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\\/]\.[^\\/.][^\\/]*[\\/](?:[^\\/]+[\\/])*shell-snapshots[\\/]snapshot-bash-")
        .expect("snapshot path pattern is valid")
});

static EVAL_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)eval\s+(?:'(?s:(.+?))'|"(?s:(.+?))")"#).expect("eval pattern is valid")
});

/// Content of whichever quote alternative matched
fn quoted(caps: &Captures<'_>) -> Option<String> {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Command passed with a short option cluster containing `c`
pub fn find_direct_flag_command(command_line: &str) -> Option<String> {
    DIRECT_FLAG.captures(command_line).and_then(|c| quoted(&c))
}

/// Command passed to the first `eval` with a quoted argument
pub fn find_eval_command(command_line: &str) -> Option<String> {
    EVAL_COMMAND.captures(command_line).and_then(|c| quoted(&c))
}

/// True if the command line references a cached shell snapshot script
pub fn contains_snapshot_path(command_line: &str) -> bool {
    SNAPSHOT_PATH.is_match(command_line)
}

/// One step of the classification cascade
struct Rule {
    name: &'static str,
    apply: fn(&str) -> Option<ExtractionResult>,
}

fn direct_flag_rule(command_line: &str) -> Option<ExtractionResult> {
    find_direct_flag_command(command_line).map(ExtractionResult::ShellInvocation)
}

fn snapshot_rule(command_line: &str) -> Option<ExtractionResult> {
    if !contains_snapshot_path(command_line) {
        return None;
    }
    Some(match find_eval_command(command_line) {
        Some(command) => ExtractionResult::SnapshotEval(command),
        None => ExtractionResult::SnapshotHint(command_line.to_string()),
    })
}

/// Rules in priority order; the direct flag form wins over snapshot replay
const CASCADE: &[Rule] = &[
    Rule {
        name: "direct-flag",
        apply: direct_flag_rule,
    },
    Rule {
        name: "snapshot",
        apply: snapshot_rule,
    },
];

/// Classifies shell command lines
///
/// Stateless apart from the shell name taken from the configuration; the same
/// input always produces the same result.
#[derive(Debug, Clone)]
pub struct CommandLineExtractor {
    /// Lowercased shell executable name
    shell_executable: String,
}

impl CommandLineExtractor {
    /// Create an extractor, rejecting invalid configurations
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shell_executable: config.shell_executable.to_lowercase(),
        })
    }

    /// True if the image is the configured shell
    ///
    /// This is a plain suffix test with no path boundary, so with the name
    /// `bash` an image such as `/usr/bin/rbash` also counts as the shell.
    pub fn is_shell(&self, image_file_name: &str) -> bool {
        image_file_name
            .to_lowercase()
            .ends_with(&self.shell_executable)
    }

    /// Classify a command line
    ///
    /// # Example
    /// ```
    /// use shelltrace_core::{CommandLineExtractor, ExtractionResult, ExtractorConfig};
    ///
    /// let config = ExtractorConfig::new().with_shell_executable("bash.exe");
    /// let extractor = CommandLineExtractor::new(&config).unwrap();
    ///
    /// assert_eq!(
    ///     extractor.extract("C:\\Git\\bin\\bash.exe", "bash.exe -lc \"echo hi\""),
    ///     ExtractionResult::ShellInvocation("echo hi".to_string()),
    /// );
    /// ```
    pub fn extract(&self, image_file_name: &str, command_line: &str) -> ExtractionResult {
        if !self.is_shell(image_file_name) {
            return ExtractionResult::NotApplicable;
        }

        for rule in CASCADE {
            if let Some(result) = (rule.apply)(command_line) {
                log::trace!("Rule '{}' matched: {}", rule.name, result);
                return result;
            }
        }

        ExtractionResult::RawExec(command_line.to_string())
    }
}
