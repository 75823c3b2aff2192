//! Coordinator driving real worker processes of the distributed binary

use reviewstream_core::ReviewItem;
use reviewstream_engine::distributed::{
    Frame, WorkerCommand, WorkerGroup, WorkerLink, DEFAULT_FRAME_CAPACITY, WORKER_RANK_FLAG,
};
use reviewstream_engine::{DistributedStrategy, ShutdownHandle, Strategy, StrategyCore};
use reviewstream_telemetry::{MemorySink, ThroughputCounter};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc;

const BINARY: &str = env!("CARGO_BIN_EXE_reviewstream-distributed");

#[tokio::test]
async fn test_round_over_worker_processes() {
    let command = WorkerCommand::new(BINARY);
    let workers = WorkerGroup::spawn_processes(&command, 3, DEFAULT_FRAME_CAPACITY).unwrap();
    assert_eq!(workers.worker_count(), 3);

    let counter = ThroughputCounter::new(Arc::new(MemorySink::new()));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let core = StrategyCore::new(counter.clone(), Duration::from_secs(1)).with_results(tx);
    let shutdown = ShutdownHandle::new();
    let strategy =
        DistributedStrategy::new(workers, core, DEFAULT_FRAME_CAPACITY, shutdown.token())
            .unwrap()
            .with_grace(Duration::from_secs(5));

    for (id, text) in ["great", "awful", "  "].into_iter().enumerate() {
        let handled = tokio::time::timeout(
            Duration::from_secs(30),
            strategy.handle_review(ReviewItem::new(id as u64, text)),
        )
        .await
        .expect("round did not complete");
        handled.unwrap();
    }

    assert_eq!(strategy.rounds(), 1);
    // The blank review comes back as "no result" and is not counted
    assert_eq!(counter.pending(), 2);

    let mut results = Vec::new();
    while let Ok(line) = rx.try_recv() {
        results.push(line);
    }
    assert_eq!(results.len(), 2);
    assert!(results[0].starts_with("Review: great | Sentiment: "));
    assert!(results[1].starts_with("Review: awful | Sentiment: "));

    tokio::time::timeout(Duration::from_secs(30), async {
        strategy.shutdown().await.unwrap();
        strategy.shutdown().await.unwrap();
    })
    .await
    .expect("shutdown did not complete");
    assert_eq!(counter.pending(), 2);
}

#[tokio::test]
async fn test_worker_process_speaks_frames_and_logs_to_stderr() {
    let mut child = Command::new(BINARY)
        .arg(WORKER_RANK_FLAG)
        .arg("1")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .unwrap();

    let stdin = child.stdin.take().unwrap();
    let stdout = child.stdout.take().unwrap();
    let mut stderr = child.stderr.take().unwrap();
    let mut link = WorkerLink::new(1, stdout, stdin, DEFAULT_FRAME_CAPACITY);

    link.send(Frame::new("I loved it")).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(30), link.recv())
        .await
        .expect("worker did not reply")
        .unwrap();
    assert_eq!(reply.payload(), "Review: I loved it | Sentiment: Very Positive");

    link.send(Frame::shutdown()).await.unwrap();
    let status = tokio::time::timeout(Duration::from_secs(30), child.wait())
        .await
        .expect("worker did not exit")
        .unwrap();
    assert!(status.success());

    // Stdout carried only the one reply frame
    assert!(matches!(
        link.recv().await,
        Err(reviewstream_core::Error::WorkerExited { rank: 1 })
    ));

    let mut logs = String::new();
    stderr.read_to_string(&mut logs).await.unwrap();
    assert!(logs.contains("Worker 1 received shutdown signal."), "{logs}");
}
