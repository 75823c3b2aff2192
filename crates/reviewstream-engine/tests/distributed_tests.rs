//! Coordinator behaviour against simulated worker sets

mod common;

use common::{scripted_worker, Harness, CAPACITY};
use reviewstream_classifiers::default_classifier;
use reviewstream_core::ReviewItem;
use reviewstream_engine::distributed::{WorkerGroup, SHUTDOWN_SENTINEL};
use reviewstream_engine::{DistributedStrategy, Strategy};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn echo_result(text: &str) -> String {
    format!("Review: {text} | Sentiment: Neutral")
}

#[tokio::test]
async fn test_round_assigns_items_by_position() {
    let mut links = Vec::new();
    let mut received = Vec::new();
    let mut handles = Vec::new();
    for rank in 1..=3 {
        let (link, log, handle) = scripted_worker(rank, echo_result);
        links.push(link);
        received.push(log);
        handles.push(handle);
    }

    let (core, mut harness) = Harness::new();
    let cancel = CancellationToken::new();
    let strategy =
        DistributedStrategy::new(WorkerGroup::from_links(links), core, CAPACITY, &cancel).unwrap();

    for (id, text) in ["a", "b", "c"].into_iter().enumerate() {
        strategy
            .handle_review(ReviewItem::new(id as u64, text))
            .await
            .unwrap();
    }

    assert_eq!(strategy.rounds(), 1);
    assert_eq!(received[0].lock().as_slice(), ["a"]);
    assert_eq!(received[1].lock().as_slice(), ["b"]);
    assert_eq!(received[2].lock().as_slice(), ["c"]);
    assert_eq!(harness.counter.pending(), 3);
    assert_eq!(
        harness.drain_results(),
        vec![echo_result("a"), echo_result("b"), echo_result("c")]
    );

    strategy.shutdown().await.unwrap();
    for handle in handles {
        handle.await.unwrap();
    }
    for log in &received {
        assert_eq!(log.lock().last().map(String::as_str), Some(SHUTDOWN_SENTINEL));
    }
}

#[tokio::test]
async fn test_partial_batch_waits_for_full_round() {
    let (l1, r1, _h1) = scripted_worker(1, echo_result);
    let (l2, r2, _h2) = scripted_worker(2, echo_result);
    let (core, harness) = Harness::new();
    let strategy = DistributedStrategy::new(
        WorkerGroup::from_links(vec![l1, l2]),
        core,
        CAPACITY,
        &CancellationToken::new(),
    )
    .unwrap();

    strategy.handle_review(ReviewItem::new(0, "first")).await.unwrap();
    assert_eq!(strategy.rounds(), 0);
    assert!(r1.lock().is_empty());
    assert_eq!(harness.counter.pending(), 0);

    strategy.handle_review(ReviewItem::new(1, "second")).await.unwrap();
    assert_eq!(strategy.rounds(), 1);
    assert_eq!(r1.lock().as_slice(), ["first"]);
    assert_eq!(r2.lock().as_slice(), ["second"]);
}

#[tokio::test]
async fn test_empty_worker_result_is_not_counted() {
    let (l1, _r1, _h1) = scripted_worker(1, echo_result);
    let (l2, _r2, _h2) = scripted_worker(2, |_| String::new());
    let (core, mut harness) = Harness::new();
    let strategy = DistributedStrategy::new(
        WorkerGroup::from_links(vec![l1, l2]),
        core,
        CAPACITY,
        &CancellationToken::new(),
    )
    .unwrap();

    strategy.handle_review(ReviewItem::new(0, "x")).await.unwrap();
    strategy.handle_review(ReviewItem::new(1, "y")).await.unwrap();

    assert_eq!(strategy.rounds(), 1);
    assert_eq!(harness.counter.pending(), 1);
    assert_eq!(harness.drain_results(), vec![echo_result("x")]);
}

#[tokio::test]
async fn test_oversized_and_sentinel_reviews_are_skipped() {
    let (l1, r1, _h1) = scripted_worker(1, echo_result);
    let (core, harness) = Harness::new();
    // 35 bytes of result overhead leave 29 bytes of review text
    let strategy = DistributedStrategy::new(
        WorkerGroup::from_links(vec![l1]),
        core,
        64,
        &CancellationToken::new(),
    )
    .unwrap();

    strategy
        .handle_review(ReviewItem::new(0, "x".repeat(30)))
        .await
        .unwrap();
    strategy
        .handle_review(ReviewItem::new(1, " shutdown "))
        .await
        .unwrap();
    assert_eq!(strategy.rounds(), 0);
    assert!(r1.lock().is_empty());

    strategy
        .handle_review(ReviewItem::new(2, "x".repeat(29)))
        .await
        .unwrap();
    assert_eq!(strategy.rounds(), 1);
    assert_eq!(harness.counter.pending(), 1);
}

#[tokio::test]
async fn test_worker_exit_mid_round_is_fatal() {
    let (l1, _r1, h1) = scripted_worker(1, echo_result);
    // Rank 2 has no worker behind it at all
    let (coordinator, worker) = tokio::io::duplex(CAPACITY);
    drop(worker);
    let (rx, tx) = tokio::io::split(coordinator);
    let l2 = reviewstream_engine::distributed::WorkerLink::new(2, rx, tx, CAPACITY);

    let (core, harness) = Harness::new();
    let strategy = DistributedStrategy::new(
        WorkerGroup::from_links(vec![l1, l2]),
        core,
        CAPACITY,
        &CancellationToken::new(),
    )
    .unwrap()
    .with_grace(Duration::from_millis(200));

    strategy.handle_review(ReviewItem::new(0, "a")).await.unwrap();
    assert!(strategy.handle_review(ReviewItem::new(1, "b")).await.is_err());
    assert_eq!(harness.counter.pending(), 0);

    // Sentinel still reaches the live worker
    strategy.shutdown().await.unwrap();
    h1.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let classifier = default_classifier().unwrap();
    let workers = WorkerGroup::spawn_in_memory(2, classifier, CAPACITY);
    let (core, harness) = Harness::new();
    let strategy =
        DistributedStrategy::new(workers, core, CAPACITY, &CancellationToken::new()).unwrap();

    strategy.handle_review(ReviewItem::new(0, "great")).await.unwrap();
    strategy.handle_review(ReviewItem::new(1, "awful")).await.unwrap();
    // Left in the batch and dropped at shutdown
    strategy.handle_review(ReviewItem::new(2, "fine")).await.unwrap();

    strategy.shutdown().await.unwrap();
    strategy.shutdown().await.unwrap();
    assert_eq!(harness.counter.pending(), 2);

    // Ignored once shut down
    strategy.handle_review(ReviewItem::new(3, "late")).await.unwrap();
    strategy.handle_review(ReviewItem::new(4, "later")).await.unwrap();
    assert_eq!(harness.counter.pending(), 2);
    assert_eq!(strategy.rounds(), 1);
}

#[tokio::test]
async fn test_zero_workers_rejected() {
    let (core, _harness) = Harness::new();
    let result = DistributedStrategy::new(
        WorkerGroup::from_links(Vec::new()),
        core,
        CAPACITY,
        &CancellationToken::new(),
    );
    assert!(result.is_err());
}
