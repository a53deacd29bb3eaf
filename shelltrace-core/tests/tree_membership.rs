// Membership behaviour of the process tree under reordered event streams
use shelltrace_core::{JoinOutcome, LeaveOutcome, Pid, ProcessTree, StartEvent, StopEvent};
use std::collections::HashSet;

fn start(pid: Pid, parent_pid: Pid) -> StartEvent {
    StartEvent {
        pid,
        parent_pid,
        image_file_name: String::new(),
        command_line: String::new(),
        process_name: "p".to_string(),
    }
}

fn stop(pid: Pid) -> StopEvent {
    StopEvent {
        pid,
        process_name: "p".to_string(),
        exit_status: 0,
    }
}

#[test]
fn stop_for_unseen_pid_is_ignored() {
    let mut tree = ProcessTree::new(1);
    assert_eq!(tree.on_stop(&stop(4242)), LeaveOutcome::Ignored);
    assert_eq!(tree.members(), vec![1]);
}

#[test]
fn stop_before_start_leaves_child_tracked() {
    let mut tree = ProcessTree::new(1);

    // The stop overtook the start; the late start still joins
    assert_eq!(tree.on_stop(&stop(2)), LeaveOutcome::Ignored);
    assert!(matches!(tree.on_start(&start(2, 1)), JoinOutcome::Joined { .. }));
    assert!(tree.contains(2));
}

#[test]
fn child_of_departed_parent_is_ignored() {
    let mut tree = ProcessTree::new(1);
    tree.on_start(&start(2, 1));
    tree.on_stop(&stop(2));

    assert_eq!(tree.on_start(&start(3, 2)), JoinOutcome::Ignored);
    assert_eq!(tree.members(), vec![1]);
}

#[test]
fn duplicate_events_are_no_ops() {
    let mut tree = ProcessTree::new(1);
    tree.on_start(&start(2, 1));
    assert_eq!(tree.on_start(&start(2, 1)), JoinOutcome::Ignored);

    assert!(matches!(tree.on_stop(&stop(2)), LeaveOutcome::Left { .. }));
    assert_eq!(tree.on_stop(&stop(2)), LeaveOutcome::Ignored);
    assert_eq!(tree.members(), vec![1]);
}

/// Small deterministic generator so the sequence is reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u32) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) % bound as u64) as u32
    }
}

#[test]
fn membership_matches_reference_model() {
    let root = 1;
    let mut tree = ProcessTree::new(root);
    let mut model: HashSet<Pid> = HashSet::from([root]);
    let mut rng = Lcg(0x5eed);

    for _ in 0..5_000 {
        let pid = rng.next(40) + 1;
        if rng.next(3) == 0 {
            let expected_left = model.remove(&pid);
            let outcome = tree.on_stop(&stop(pid));
            assert_eq!(matches!(outcome, LeaveOutcome::Left { .. }), expected_left);
        } else {
            let parent = rng.next(40) + 1;
            let expected_join = model.contains(&parent) && !model.contains(&pid);
            if expected_join {
                model.insert(pid);
            }
            let outcome = tree.on_start(&start(pid, parent));
            assert_eq!(matches!(outcome, JoinOutcome::Joined { .. }), expected_join);
        }

        let mut expected: Vec<Pid> = model.iter().copied().collect();
        expected.sort_unstable();
        assert_eq!(tree.members(), expected);
    }
}

#[test]
fn same_sequence_gives_same_outcomes() {
    let events: Vec<(bool, Pid, Pid)> = vec![
        (true, 2, 1),
        (true, 3, 2),
        (false, 2, 0),
        (true, 4, 2),
        (true, 5, 3),
        (false, 1, 0),
        (true, 6, 1),
    ];

    let run = || {
        let mut tree = ProcessTree::new(1);
        let mut outcomes = Vec::new();
        for &(is_start, pid, parent) in &events {
            if is_start {
                outcomes.push(format!("{:?}", tree.on_start(&start(pid, parent))));
            } else {
                outcomes.push(format!("{:?}", tree.on_stop(&stop(pid))));
            }
        }
        (outcomes, tree.members())
    };

    let (first, members) = run();
    assert_eq!(run(), (first, members.clone()));
    assert_eq!(members, vec![3, 5]);
}
