// Classification of realistic shell command lines
use shelltrace_core::{CommandLineExtractor, ExtractionResult, ExtractorConfig};

const SNAPSHOT: &str = "/c/Users/dev/.claude/shell-snapshots/snapshot-bash-1718031455-abc.sh";

fn extractor() -> CommandLineExtractor {
    let config = ExtractorConfig::new().with_shell_executable("bash.exe");
    CommandLineExtractor::new(&config).unwrap()
}

#[test]
fn direct_login_flag_invocation() {
    assert_eq!(
        extractor().extract("bash.exe", "bash.exe -lc \"echo hi\""),
        ExtractionResult::ShellInvocation("echo hi".to_string())
    );
}

#[test]
fn snapshot_replay_with_eval() {
    let line = format!(
        "\"C:\\Program Files\\Git\\bin\\bash.exe\" -c -l source {} && eval \"ls -la\" < /dev/null && pwd -P",
        SNAPSHOT
    );
    assert_eq!(
        extractor().extract("C:\\Program Files\\Git\\bin\\bash.exe", &line),
        ExtractionResult::SnapshotEval("ls -la".to_string())
    );
}

#[test]
fn snapshot_replay_without_eval() {
    let line = format!("bash.exe -l source {} && pwd -P", SNAPSHOT);
    assert_eq!(
        extractor().extract("bash.exe", &line),
        ExtractionResult::SnapshotHint(line.clone())
    );
}

#[test]
fn bare_shell_is_raw() {
    assert_eq!(
        extractor().extract("bash.exe", "bash.exe"),
        ExtractionResult::RawExec("bash.exe".to_string())
    );
}

#[test]
fn other_images_not_applicable() {
    let ex = extractor();
    for line in ["notepad.exe", "notepad.exe -c \"x\"", SNAPSHOT, ""] {
        assert_eq!(ex.extract("notepad.exe", line), ExtractionResult::NotApplicable);
    }
}

#[test]
fn direct_flag_takes_precedence_over_snapshot() {
    let line = format!("bash.exe -c \"source {} && eval 'make test'\"", SNAPSHOT);
    assert_eq!(
        extractor().extract("bash.exe", &line),
        ExtractionResult::ShellInvocation(format!("source {} && eval 'make test'", SNAPSHOT))
    );
}

#[test]
fn backslash_snapshot_path_with_single_quoted_eval() {
    let line = "bash.exe -l C:\\Users\\dev\\.claude\\shell-snapshots\\snapshot-bash-7.sh eval 'git status'";
    assert_eq!(
        extractor().extract("bash.exe", line),
        ExtractionResult::SnapshotEval("git status".to_string())
    );
}

#[test]
fn multiline_eval_payload() {
    let line = format!("bash -l {} eval 'for f in *; do\n  echo $f\ndone'", SNAPSHOT);
    assert_eq!(
        extractor().extract("BASH.EXE", &line),
        ExtractionResult::SnapshotEval("for f in *; do\n  echo $f\ndone".to_string())
    );
}

#[test]
fn extraction_is_deterministic() {
    let ex = extractor();
    let inputs = [
        ("bash.exe", "bash.exe -ic 'ls'"),
        ("bash.exe", "bash.exe"),
        ("cmd.exe", "cmd.exe /c dir"),
    ];
    for (image, line) in inputs {
        assert_eq!(ex.extract(image, line), ex.extract(image, line));
        assert_eq!(extractor().extract(image, line), ex.extract(image, line));
    }
}
