//! End-to-end runs of the pipeline over an in-memory feed

mod common;

use common::{shared, Harness, MockClassifier, CAPACITY};
use reviewstream_classifiers::default_classifier;
use reviewstream_core::{extract_topics, SentimentLabel};
use reviewstream_engine::distributed::WorkerGroup;
use reviewstream_engine::{
    DistributedStrategy, MemorySource, Pipeline, SequentialStrategy, ShutdownHandle, StopReason,
    Strategy, CLOSE_REASON,
};
use std::sync::Arc;
use std::time::Duration;

fn envelope(topic: &str, text: &str) -> String {
    let inner = serde_json::json!({ "reviewText": text }).to_string();
    let mut outer = serde_json::Map::new();
    outer.insert(topic.to_string(), inner.into());
    serde_json::Value::Object(outer).to_string()
}

#[tokio::test(start_paused = true)]
async fn test_sequential_end_to_end_tick() {
    let classifier = default_classifier().unwrap();
    let (core, mut harness) = Harness::new();
    let strategy: Arc<dyn Strategy> = Arc::new(SequentialStrategy::new(classifier, core));
    let shutdown = ShutdownHandle::new();
    let pipeline = Pipeline::new(strategy, extract_topics("books"), &shutdown);

    let mut source = MemorySource::new([envelope("books", "I loved it")]).hold_open();
    let run = tokio::spawn(async move {
        let report = pipeline.run(&mut source).await;
        (report, source)
    });

    // Ticks at 1 s and 2 s
    tokio::time::sleep(Duration::from_millis(2500)).await;
    shutdown.trigger("test finished");
    let (report, source) = run.await.unwrap();
    let report = report.unwrap();

    assert_eq!(
        harness.drain_results(),
        vec!["Review: I loved it | Sentiment: Very Positive".to_string()]
    );
    assert_eq!(
        harness.sink.lines(),
        vec![
            "Analyzed Reviews per Second: 1".to_string(),
            "Analyzed Reviews per Second: 0".to_string(),
        ]
    );
    assert_eq!(report.received, 1);
    assert_eq!(report.extracted, 1);
    assert_eq!(report.stop, StopReason::Cancelled);
    assert_eq!(source.directives(), ["topic:books"]);
    assert_eq!(source.close_reasons(), [CLOSE_REASON]);
    assert!(!harness.counter.is_running());
}

#[tokio::test]
async fn test_malformed_messages_are_skipped() {
    let (mock, classifier) = shared(MockClassifier::new(SentimentLabel::Neutral));
    let (core, harness) = Harness::new();
    let strategy: Arc<dyn Strategy> = Arc::new(SequentialStrategy::new(classifier, core));
    let pipeline = Pipeline::new(strategy, vec!["music".into()], &ShutdownHandle::new());

    let mut source = MemorySource::new([
        "not json".to_string(),
        r#"{"music":"not-json"}"#.to_string(),
        String::new(),
        envelope("music", "great product"),
    ]);
    let report = pipeline.run(&mut source).await.unwrap();

    assert_eq!(report.received, 4);
    assert_eq!(report.skipped, 3);
    assert_eq!(report.extracted, 1);
    assert_eq!(report.stop, StopReason::FeedClosed);
    assert_eq!(mock.calls(), 1);
    assert_eq!(harness.counter.pending(), 1);
}

#[tokio::test]
async fn test_transport_error_still_shuts_down() {
    let (_mock, classifier) = shared(MockClassifier::new(SentimentLabel::Neutral));
    let (core, harness) = Harness::new();
    let strategy: Arc<dyn Strategy> = Arc::new(SequentialStrategy::new(classifier, core));
    let pipeline = Pipeline::new(strategy, vec!["tech".into()], &ShutdownHandle::new());

    let mut source = MemorySource::new([envelope("tech", "a"), envelope("tech", "b")]).fail_after(1);
    let report = pipeline.run(&mut source).await.unwrap();

    assert!(matches!(report.stop, StopReason::Transport(_)));
    assert_eq!(harness.counter.pending(), 1);
    assert!(!harness.counter.is_running());
    assert_eq!(source.close_reasons(), [CLOSE_REASON]);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_cancels_idle_feed() {
    let (_mock, classifier) = shared(MockClassifier::new(SentimentLabel::Neutral));
    let (core, _harness) = Harness::new();
    let strategy: Arc<dyn Strategy> = Arc::new(SequentialStrategy::new(classifier, core));
    let shutdown = ShutdownHandle::new();
    let timer = shutdown.arm_timeout(Duration::from_secs(5 * 60));
    let pipeline = Pipeline::new(strategy, vec!["books".into()], &shutdown);

    let mut source = MemorySource::new(Vec::<String>::new()).hold_open();
    let report = pipeline.run(&mut source).await.unwrap();

    assert_eq!(report.stop, StopReason::Cancelled);
    assert!(shutdown.is_triggered());
    timer.await.unwrap();
}

#[tokio::test]
async fn test_distributed_end_to_end() {
    let classifier = default_classifier().unwrap();
    let workers = WorkerGroup::spawn_in_memory(2, classifier, CAPACITY);
    let shutdown = ShutdownHandle::new();
    let (core, mut harness) = Harness::new();
    let strategy: Arc<dyn Strategy> =
        Arc::new(DistributedStrategy::new(workers, core, CAPACITY, shutdown.token()).unwrap());
    let pipeline = Pipeline::new(strategy, extract_topics("books, music"), &shutdown);

    let mut source = MemorySource::new(
        ["one", "two", "three", "four", "five"]
            .iter()
            .map(|text| envelope("books", text)),
    );
    let report = pipeline.run(&mut source).await.unwrap();

    assert_eq!(report.extracted, 5);
    // Two full rounds; the fifth review never formed a batch
    let results = harness.drain_results();
    assert_eq!(results.len(), 4);
    assert!(results[0].starts_with("Review: one | Sentiment: "));
    assert!(results[3].starts_with("Review: four | Sentiment: "));
    assert_eq!(harness.counter.pending(), 4);
    assert_eq!(source.directives(), ["topic:books", "topic:music"]);
}
