//! Integration tests for at-least-once delivery
//!
//! These tests verify:
//! - Every sent message is eventually handled and marked processed
//! - A failed delivery leaves the message eligible for redelivery
//! - The processed flag never reverts and processed messages are not redelivered
//! - Several consumers can drain one watcher

mod common;

use common::{queue_over, FaultyStore, RecordingHandler, POLL_INTERVAL};
use docqueue_core::stores::InMemoryStore;
use docqueue_core::{MessageId, MessageStore, QueueError, Supervisor};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_two_messages_delivered_within_one_poll_cycle() {
    let store = InMemoryStore::new();
    let queue = queue_over(Arc::new(store.clone()));
    let a = queue.producer().send("a").await.unwrap();
    let b = queue.producer().send("b").await.unwrap();

    let handler = RecordingHandler::new();
    let mut supervisor = Supervisor::new();
    supervisor.spawn_watcher(queue.watcher());
    supervisor.spawn_consumer("consumer-0", queue.consumer(handler.clone()));

    tokio::time::sleep(POLL_INTERVAL + Duration::from_millis(500)).await;
    supervisor.shutdown();
    supervisor.wait().await.unwrap();

    assert_eq!(handler.bodies(), vec!["a", "b"]);
    for id in [&a, &b] {
        assert!(store.get(id).await.unwrap().unwrap().processed);
    }
    assert!(store.find_unprocessed(5).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_every_message_eventually_processed() {
    let store = InMemoryStore::new();
    let queue = queue_over(Arc::new(store.clone()));
    let mut ids = Vec::new();
    for i in 0..12 {
        ids.push(queue.producer().send(format!("message {i}")).await.unwrap());
    }

    let handler = RecordingHandler::new();
    let mut supervisor = Supervisor::new();
    supervisor.spawn_watcher(queue.watcher());
    supervisor.spawn_consumer("consumer-0", queue.consumer(handler.clone()));

    // 12 messages at 5 per page need three scans
    tokio::time::sleep(Duration::from_secs(4)).await;
    supervisor.shutdown();
    supervisor.wait().await.unwrap();

    for id in &ids {
        assert!(handler.deliveries_of(id) >= 1, "message {id} never handled");
        assert!(store.get(id).await.unwrap().unwrap().processed);
    }
    assert_eq!(queue.metrics().messages_processed, 12);
}

#[tokio::test(start_paused = true)]
async fn test_failed_handler_leaves_message_for_redelivery() {
    let store = InMemoryStore::new();
    let shared: Arc<dyn MessageStore> = Arc::new(store.clone());
    let queue = queue_over(Arc::clone(&shared));
    let id = queue.producer().send("fragile").await.unwrap();

    let handler = RecordingHandler::rejecting_once("fragile");
    let mut supervisor = Supervisor::new();
    supervisor.spawn_watcher(queue.watcher());
    supervisor.spawn_consumer("consumer-0", queue.consumer(handler.clone()));

    let error = supervisor.wait().await.unwrap_err();
    match error {
        QueueError::Handler { message_id, .. } => assert_eq!(message_id, id),
        other => panic!("Expected handler error, got {other:?}"),
    }
    assert!(!store.get(&id).await.unwrap().unwrap().processed);

    // A fresh run over the same store picks the message up again
    let queue = queue_over(shared);
    let mut supervisor = Supervisor::new();
    supervisor.spawn_watcher(queue.watcher());
    supervisor.spawn_consumer("consumer-0", queue.consumer(handler.clone()));

    tokio::time::sleep(Duration::from_millis(500)).await;
    supervisor.shutdown();
    supervisor.wait().await.unwrap();

    assert_eq!(handler.deliveries_of(&id), 2);
    assert!(store.get(&id).await.unwrap().unwrap().processed);
}

#[tokio::test(start_paused = true)]
async fn test_failed_mark_is_fatal_and_message_stays_unprocessed() {
    let store = FaultyStore::new();
    store.fail_marks(true);
    let queue = queue_over(Arc::new(store.clone()));
    let id = queue.producer().send("unmarked").await.unwrap();

    let handler = RecordingHandler::new();
    let mut supervisor = Supervisor::new();
    supervisor.spawn_watcher(queue.watcher());
    supervisor.spawn_consumer("consumer-0", queue.consumer(handler.clone()));

    let error = supervisor.wait().await.unwrap_err();
    assert!(matches!(error, QueueError::Store(_)));
    assert!(error.is_transient());

    assert_eq!(handler.deliveries_of(&id), 1);
    let pending = store.inner().find_unprocessed(5).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);
}

#[tokio::test(start_paused = true)]
async fn test_processed_messages_are_not_redelivered() {
    let store = InMemoryStore::new();
    let queue = queue_over(Arc::new(store.clone()));
    let id = queue.producer().send("once").await.unwrap();

    let handler = RecordingHandler::new();
    let mut supervisor = Supervisor::new();
    supervisor.spawn_watcher(queue.watcher());
    supervisor.spawn_consumer("consumer-0", queue.consumer(handler.clone()));

    tokio::time::sleep(Duration::from_secs(5)).await;
    supervisor.shutdown();
    supervisor.wait().await.unwrap();

    assert_eq!(handler.deliveries_of(&id), 1);
    assert!(queue.metrics().scans >= 5);
}

#[tokio::test]
async fn test_processed_flag_is_monotonic() {
    let store = InMemoryStore::new();
    let queue = queue_over(Arc::new(store.clone()));
    let id = queue.producer().send("flag").await.unwrap();

    store.mark_processed(&id).await.unwrap();
    store.mark_processed(&id).await.unwrap();

    let message = store.get(&id).await.unwrap().unwrap();
    assert!(message.processed);
    assert_eq!(message.body_str(), Some("flag"));
    assert!(store.find_unprocessed(5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_marking_unknown_id_is_a_no_op() {
    let store = InMemoryStore::new();
    let queue = queue_over(Arc::new(store.clone()));
    let id = queue.producer().send("kept").await.unwrap();

    store.mark_processed(&MessageId::new()).await.unwrap();

    let pending = store.find_unprocessed(5).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);
}

#[tokio::test(start_paused = true)]
async fn test_multiple_consumers_share_one_watcher() {
    let store = InMemoryStore::new();
    let queue = queue_over(Arc::new(store.clone()));
    let mut ids = Vec::new();
    for i in 0..10 {
        ids.push(queue.producer().send(format!("job {i}")).await.unwrap());
    }

    let handler = RecordingHandler::new();
    let mut supervisor = Supervisor::new();
    supervisor.spawn_watcher(queue.watcher());
    for index in 0..3 {
        supervisor.spawn_consumer(
            format!("consumer-{index}"),
            queue.consumer(handler.clone()),
        );
    }

    tokio::time::sleep(Duration::from_secs(3)).await;
    supervisor.shutdown();
    supervisor.wait().await.unwrap();

    for id in &ids {
        assert!(handler.deliveries_of(id) >= 1);
    }
    assert!(store.find_unprocessed(10).await.unwrap().is_empty());
    assert_eq!(queue.metrics().messages_processed as usize, handler.len());
}
