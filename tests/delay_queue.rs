use rand::Rng;
use seashell::command::Command;
use seashell::delay::{DelayQueue, Scheduler};
use seashell::error::QueueError;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

fn cmd(line: &str) -> Command {
    Command::new(line.split_whitespace().map(str::to_string).collect(), false)
}

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

#[test]
fn stays_sorted_under_random_inserts() {
    let mut rng = rand::rng();
    for _ in 0..50 {
        let mut q = DelayQueue::with_capacity(32);
        for _ in 0..32 {
            q.insert(&cmd("true"), at(rng.random_range(0..20))).unwrap();
            let due: Vec<SystemTime> = q.iter().map(|e| e.due_at).collect();
            assert!(due.windows(2).all(|w| w[0] <= w[1]), "unsorted: {due:?}");
        }
        assert_eq!(q.len(), 32);
    }
}

#[test]
fn equal_due_times_keep_arrival_order() {
    let mut q = DelayQueue::with_capacity(8);
    assert_eq!(q.insert(&cmd("first"), at(5)).unwrap(), 0);
    assert_eq!(q.insert(&cmd("second"), at(5)).unwrap(), 1);
    assert_eq!(q.insert(&cmd("early"), at(1)).unwrap(), 0);
    let order: Vec<&str> = q.iter().map(|e| e.command.argv[0].as_str()).collect();
    assert_eq!(order, vec!["early", "first", "second"]);
}

#[test]
fn full_queue_rejects_and_stays_unchanged() {
    let mut q = DelayQueue::with_capacity(2);
    q.insert(&cmd("a"), at(1)).unwrap();
    q.insert(&cmd("b"), at(2)).unwrap();
    assert_eq!(q.insert(&cmd("c"), at(0)), Err(QueueError::Full { capacity: 2 }));
    assert_eq!(q.len(), 2);
    assert_eq!(q.front().unwrap().command.argv, vec!["a".to_string()]);
}

#[test]
fn entry_is_not_due_at_its_own_instant() {
    let mut q = DelayQueue::with_capacity(4);
    q.insert(&cmd("x"), at(10)).unwrap();
    assert!(q.pop_due(at(9)).is_none());
    assert!(q.pop_due(at(10)).is_none());
    let e = q.pop_due(at(10) + Duration::from_millis(1)).unwrap();
    assert_eq!(e.command.argv, vec!["x".to_string()]);
    assert!(q.is_empty());
    assert!(q.pop_due(at(100)).is_none());
}

#[test]
fn queued_copy_is_independent_of_caller() {
    let mut q = DelayQueue::with_capacity(4);
    let mut original = cmd("echo hi");
    q.insert(&original, at(1)).unwrap();
    original.argv[1] = "bye".into();
    drop(original);
    assert_eq!(q.front().unwrap().command.argv, vec!["echo".to_string(), "hi".to_string()]);
}

#[test]
fn one_entry_matures_per_tick() {
    let s = Scheduler::new(8, Duration::from_millis(10));
    s.enqueue(&cmd("a"), at(1)).unwrap();
    s.enqueue(&cmd("b"), at(2)).unwrap();
    s.enqueue(&cmd("c"), at(50)).unwrap();
    let ran = Arc::new(Mutex::new(Vec::new()));
    let now = at(10);
    for _ in 0..3 {
        let ran = Arc::clone(&ran);
        s.poll_tick(now, move |e| ran.lock().unwrap().push(e.command.argv[0].clone()));
    }
    assert_eq!(*ran.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(s.pending(), 1);
    assert_eq!(s.due_times(), vec![at(50)]);
}

#[test]
fn poller_thread_runs_due_commands() {
    let s = Scheduler::new(4, Duration::from_millis(10));
    let ran = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&ran);
    s.spawn_poller(move |e| sink.lock().unwrap().push(e.command.argv.join(" "))).unwrap();
    let now = SystemTime::now();
    s.enqueue(&cmd("later"), now + Duration::from_millis(60)).unwrap();
    s.enqueue(&cmd("soon"), now).unwrap();
    s.wait_idle();
    assert_eq!(*ran.lock().unwrap(), vec!["soon".to_string(), "later".to_string()]);
}
