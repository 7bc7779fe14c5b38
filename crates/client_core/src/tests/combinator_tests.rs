use std::time::Duration;

use tokio::task::LocalSet;

use crate::{race, timeout, wait_all, Promise, PromiseState, Scheduler};

#[test]
fn preserves_input_order_regardless_of_completion_order() {
    let scheduler = Scheduler::new();
    let (d1, p1) = scheduler.deferred::<&str, String>();
    let (d2, p2) = scheduler.deferred::<&str, String>();
    let (d3, p3) = scheduler.deferred::<&str, String>();

    let all = wait_all(&scheduler, [p1, p2, p3]);

    d3.resolve("c");
    scheduler.run_until_idle();
    d1.resolve("a");
    scheduler.run_until_idle();
    assert_eq!(all.state(), PromiseState::Pending);

    d2.resolve("b");
    scheduler.run_until_idle();
    assert_eq!(all.outcome(), Some(Ok(vec!["a", "b", "c"])));
}

#[test]
fn rejects_on_first_failure_without_waiting_for_the_rest() {
    let scheduler = Scheduler::new();
    let (d1, p1) = scheduler.deferred::<u8, String>();
    let (d2, p2) = scheduler.deferred::<u8, String>();
    let (d3, p3) = scheduler.deferred::<u8, String>();

    let all = wait_all(&scheduler, [p1.clone(), p2, p3]);

    d2.reject("boom".to_string());
    scheduler.run_until_idle();
    assert_eq!(all.outcome(), Some(Err("boom".to_string())));

    d1.resolve(1);
    d3.reject("later".to_string());
    scheduler.run_until_idle();
    assert_eq!(all.outcome(), Some(Err("boom".to_string())));
    assert_eq!(p1.outcome(), Some(Ok(1)));
}

#[test]
fn empty_input_fulfills_with_empty_vec() {
    let scheduler = Scheduler::new();
    let all = wait_all::<u8, String, _>(&scheduler, Vec::new());
    scheduler.run_until_idle();
    assert_eq!(all.outcome(), Some(Ok(Vec::new())));
}

#[test]
fn repeated_and_presettled_inputs_fill_every_position() {
    let scheduler = Scheduler::new();
    let ready: Promise<u8, String> = scheduler.resolved(1);
    let (later_deferred, later) = scheduler.deferred::<u8, String>();

    let all = wait_all(&scheduler, vec![later.clone(), ready, later]);
    later_deferred.resolve(2);
    scheduler.run_until_idle();

    assert_eq!(all.outcome(), Some(Ok(vec![2, 1, 2])));
}

#[test]
fn race_takes_the_first_outcome() {
    let scheduler = Scheduler::new();
    let (slow_deferred, slow) = scheduler.deferred::<&str, String>();
    let (fast_deferred, fast) = scheduler.deferred::<&str, String>();

    let first = race(&scheduler, [slow, fast]);
    fast_deferred.reject("fast failure".to_string());
    scheduler.run_until_idle();
    slow_deferred.resolve("slow");
    scheduler.run_until_idle();

    assert_eq!(first.outcome(), Some(Err("fast failure".to_string())));
}

#[tokio::test]
async fn timeout_rejects_operations_that_never_settle() {
    LocalSet::new()
        .run_until(async {
            let scheduler = Scheduler::new();
            tokio::task::spawn_local(scheduler.clone().run());

            let (_never, pending) = scheduler.deferred::<u8, String>();
            let guarded = timeout(&pending, Duration::from_millis(20), "timed out".to_string());
            assert_eq!(guarded.await, Err("timed out".to_string()));

            let quick: Promise<u8, String> = scheduler.resolved(4);
            let guarded = timeout(&quick, Duration::from_secs(5), "timed out".to_string());
            assert_eq!(guarded.await, Ok(4));
        })
        .await;
}
