// tests/process_handle.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::sync::Arc;
use std::time::{Duration, Instant};

use convcache::exec::{Launch, ProcessHandle, ProcessRegistry, RealSpawner};
use convcache::types::{ProcessOutcome, RunMode};

fn handle(cmd: &str) -> ProcessHandle {
    ProcessHandle::new(cmd, Arc::new(RealSpawner))
}

/// Drive the registry until `pid` has been reaped.
async fn reap_until_gone(registry: &mut ProcessRegistry, pid: u32) {
    while registry.contains(pid) {
        registry.next_exit().await;
        registry.reap();
    }
}

#[tokio::test]
async fn wait_mode_returns_exit_code() {
    init_tracing();
    let mut registry = ProcessRegistry::new();

    let ok = handle("true").run(RunMode::Wait, &mut registry).await;
    assert_eq!(ok, Launch::Finished(ProcessOutcome::Exited(0)));

    let mut h = handle("sh -c 'exit 3'");
    let outcome = h.run_wait().await;
    assert_eq!(outcome, ProcessOutcome::Exited(3));
    assert_eq!(h.exit_code(), Some(3));
    assert!(!h.running());
    assert!(registry.is_empty(), "wait mode never registers");
}

#[tokio::test]
async fn spawn_failure_completes_immediately() {
    init_tracing();
    let mut registry = ProcessRegistry::new();

    let mut h = handle("/nonexistent/convcache-test-binary --flag");
    let rx = h.subscribe();
    let launch = h.run(RunMode::Async, &mut registry).await;

    assert!(matches!(launch, Launch::Finished(ProcessOutcome::SpawnFailed(_))));
    assert!(registry.is_empty());
    let delivered = rx.await.expect("subscriber must be notified");
    assert!(matches!(delivered, ProcessOutcome::SpawnFailed(_)));
}

#[tokio::test]
async fn empty_command_is_a_spawn_failure() {
    let mut h = handle("   ");
    assert!(matches!(h.run_wait().await, ProcessOutcome::SpawnFailed(_)));
    assert_eq!(h.pid(), None);
}

#[tokio::test]
async fn async_mode_registers_and_notifies_on_reap() {
    init_tracing();
    let mut registry = ProcessRegistry::new();

    let mut h = handle("sh -c 'sleep 0.2; exit 4'");
    let mut rx = h.subscribe();
    let Launch::Registered(pid) = h.run(RunMode::Async, &mut registry).await else {
        panic!("expected the process to be registered");
    };
    assert!(registry.contains(pid));
    assert!(rx.try_recv().is_err(), "nothing delivered before exit");

    with_timeout(reap_until_gone(&mut registry, pid)).await;

    assert_eq!(rx.await.unwrap(), ProcessOutcome::Exited(4));
}

#[tokio::test]
async fn subscribe_after_exit_delivers_at_once() {
    let mut h = handle("true");
    h.run_wait().await;
    let rx = h.subscribe();
    assert_eq!(rx.await.unwrap(), ProcessOutcome::Exited(0));
}

#[tokio::test]
async fn kill_with_zero_tolerance_is_immediate() {
    init_tracing();
    let mut registry = ProcessRegistry::new();

    let Launch::Registered(pid) = handle("sleep 30").run_async(&mut registry) else {
        panic!("sleep should start");
    };

    let h = registry.get_mut(pid).unwrap();
    h.kill(0);
    assert!(!h.kill_timer_armed(), "SIGKILL needs no timer");

    let started = Instant::now();
    with_timeout(async {
        while registry.get_mut(pid).unwrap().running() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(started.elapsed() < Duration::from_secs(2));

    assert_eq!(
        registry.get(pid).unwrap().outcome(),
        Some(ProcessOutcome::Signalled(9))
    );
    let reaped = registry.reap();
    assert_eq!(reaped, vec![(pid, ProcessOutcome::Signalled(9))]);
}

#[tokio::test]
async fn kill_escalates_after_tolerance() {
    init_tracing();
    let mut registry = ProcessRegistry::new();

    let Launch::Registered(pid) =
        handle(r#"sh -c 'trap "" TERM; sleep 30'"#).run_async(&mut registry)
    else {
        panic!("sh should start");
    };
    // Let the shell install its trap.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let started = Instant::now();
    let h = registry.get_mut(pid).unwrap();
    h.kill(1);
    assert!(h.kill_timer_armed(), "SIGTERM is ignored, so a timer is armed");

    with_timeout(reap_until_gone(&mut registry, pid)).await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(1), "killed too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "killed too late: {elapsed:?}");
}

#[tokio::test]
async fn kill_after_exit_arms_nothing() {
    let mut registry = ProcessRegistry::new();
    let Launch::Registered(pid) = handle("true").run_async(&mut registry) else {
        panic!("true should start");
    };
    with_timeout(registry.next_exit()).await;

    let h = registry.get_mut(pid).unwrap();
    h.kill(5);
    assert!(!h.kill_timer_armed());
    assert!(!h.running());
}

#[tokio::test]
async fn terminated_process_without_trap_needs_no_timer() {
    let mut registry = ProcessRegistry::new();
    let Launch::Registered(pid) = handle("sleep 30").run_async(&mut registry) else {
        panic!("sleep should start");
    };

    assert!(registry.kill(pid, 5));
    assert!(!registry.contains(pid), "kill forgets the handle immediately");

    // Whether or not a timer was armed, it must be gone once the exit is seen.
    with_timeout(async {
        while registry.next_exit().await != Some(pid) {}
    })
    .await;
    assert_eq!(registry.armed_timers(), 0);
}
