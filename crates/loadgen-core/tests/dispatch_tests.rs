use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use loadgen_core::{Dispatcher, ErrorKind, Outcome};

#[test]
fn zero_concurrency_is_rejected() {
    assert!(Dispatcher::new(0).is_err());
    assert_eq!(Dispatcher::new(1).unwrap().concurrency(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn joins_every_unit_in_completion_order() {
    let dispatcher = Dispatcher::new(5).unwrap();
    let start = Instant::now();
    let mut seen = Vec::new();
    let outcomes = dispatcher
        .run(
            |index| async move {
                // index 0 is the slowest
                let delay = Duration::from_millis(60 * (5 - index as u64));
                tokio::time::sleep(delay).await;
                if index % 2 == 0 {
                    Outcome::success(index, delay, "text")
                } else {
                    Outcome::failure(index, delay, ErrorKind::HttpStatus(500))
                }
            },
            |o| seen.push(o.index),
        )
        .await;

    assert!(start.elapsed() >= Duration::from_millis(300));
    // all five ran in parallel rather than one after another
    assert!(start.elapsed() < Duration::from_millis(900));
    assert_eq!(outcomes.len(), 5);
    assert_eq!(seen, vec![4, 3, 2, 1, 0]);
    let indices: BTreeSet<usize> = outcomes.iter().map(|o| o.index).collect();
    assert_eq!(indices, (0..5).collect());
    assert_eq!(outcomes.iter().filter(|o| o.success).count(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_unit_still_yields_an_outcome() {
    let dispatcher = Dispatcher::new(4).unwrap();
    let outcomes = dispatcher
        .run(
            |index| async move {
                if index == 2 {
                    panic!("unit {} exploded", index);
                }
                Outcome::success(index, Duration::from_millis(1), "ok")
            },
            |_| {},
        )
        .await;

    assert_eq!(outcomes.len(), 4);
    let failed: Vec<&Outcome> = outcomes.iter().filter(|o| !o.success).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].index, 2);
    assert_eq!(failed[0].error, Some(ErrorKind::TaskFailed));
}
