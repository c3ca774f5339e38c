//! Tests for the consumer role.

use super::*;
use crate::error::{HandlerError, StoreError};
use crate::handoff::{self, HandoffSender};
use crate::store::MockMessageStore;
use crate::stores::InMemoryStore;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Handler that records every message it sees
#[derive(Default)]
struct RecordingHandler {
    seen: Mutex<Vec<Message>>,
}

impl RecordingHandler {
    fn seen(&self) -> Vec<Message> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        self.seen.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Handler that rejects every message
struct RejectingHandler;

#[async_trait]
impl MessageHandler for RejectingHandler {
    async fn handle(&self, _message: &Message) -> Result<(), HandlerError> {
        Err(HandlerError::failed("side effect failed"))
    }
}

fn build_consumer(
    store: Arc<dyn MessageStore>,
    handler: Arc<dyn MessageHandler>,
) -> (Consumer, HandoffSender, Arc<QueueMetrics>) {
    let (tx, rx) = handoff::channel();
    let metrics = Arc::new(QueueMetrics::new());
    let consumer = Consumer::new(store, rx, handler, metrics.clone());
    (consumer, tx, metrics)
}

#[tokio::test]
async fn test_consumer_handles_then_marks_processed() {
    let store = InMemoryStore::new();
    let message = Message::new("a");
    store.insert(&message).await.unwrap();
    let handler = Arc::new(RecordingHandler::default());
    let (consumer, tx, metrics) = build_consumer(Arc::new(store.clone()), handler.clone());
    let token = CancellationToken::new();

    let handle = tokio::spawn({
        let token = token.clone();
        async move { consumer.run(token).await }
    });

    tx.send(message.clone(), &token).await.unwrap();
    drop(tx);

    assert!(handle.await.unwrap().is_ok());
    assert_eq!(handler.seen(), vec![message.clone()]);
    assert!(store.get(&message.id).await.unwrap().unwrap().processed);
    assert_eq!(metrics.snapshot().messages_processed, 1);
}

#[tokio::test]
async fn test_redelivered_message_is_marked_again_without_error() {
    let store = InMemoryStore::new();
    let message = Message::new("twice");
    store.insert(&message).await.unwrap();
    let handler = Arc::new(RecordingHandler::default());
    let (consumer, tx, _metrics) = build_consumer(Arc::new(store.clone()), handler.clone());
    let token = CancellationToken::new();

    let handle = tokio::spawn({
        let token = token.clone();
        async move { consumer.run(token).await }
    });

    tx.send(message.clone(), &token).await.unwrap();
    tx.send(message.clone(), &token).await.unwrap();
    drop(tx);

    assert!(handle.await.unwrap().is_ok());
    assert_eq!(handler.seen().len(), 2);
    assert!(store.get(&message.id).await.unwrap().unwrap().processed);
}

#[tokio::test]
async fn test_handler_error_stops_consumer_without_marking() {
    let store = InMemoryStore::new();
    let message = Message::new("poison");
    store.insert(&message).await.unwrap();
    let (consumer, tx, metrics) =
        build_consumer(Arc::new(store.clone()), Arc::new(RejectingHandler));
    let token = CancellationToken::new();

    let handle = tokio::spawn({
        let token = token.clone();
        async move { consumer.run(token).await }
    });

    tx.send(message.clone(), &token).await.unwrap();
    let result = handle.await.unwrap();

    assert!(
        matches!(&result, Err(QueueError::Handler { message_id, .. }) if *message_id == message.id),
        "unexpected result: {:?}",
        result
    );
    assert!(!store.get(&message.id).await.unwrap().unwrap().processed);
    assert_eq!(metrics.snapshot().messages_processed, 0);
}

#[tokio::test]
async fn test_mark_error_is_surfaced() {
    let mut store = MockMessageStore::new();
    store.expect_mark_processed().times(1).returning(|_| {
        Err(StoreError::ConnectionFailed {
            message: "write rejected".to_string(),
        })
    });
    let (consumer, tx, _metrics) =
        build_consumer(Arc::new(store), Arc::new(RecordingHandler::default()));
    let token = CancellationToken::new();

    let handle = tokio::spawn({
        let token = token.clone();
        async move { consumer.run(token).await }
    });

    tx.send(Message::new("a"), &token).await.unwrap();

    assert!(matches!(
        handle.await.unwrap(),
        Err(QueueError::Store(StoreError::ConnectionFailed { .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_returns_ok_while_idle() {
    let (consumer, _tx, _metrics) = build_consumer(
        Arc::new(InMemoryStore::new()),
        Arc::new(RecordingHandler::default()),
    );
    let ready = consumer.ready();
    let token = CancellationToken::new();

    let handle = tokio::spawn({
        let token = token.clone();
        async move { consumer.run(token).await }
    });

    ready.wait_timeout(Duration::from_secs(1)).await.unwrap();
    token.cancel();

    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_ready_signal_unset_before_run() {
    let (consumer, _tx, _metrics) = build_consumer(
        Arc::new(InMemoryStore::new()),
        Arc::new(RecordingHandler::default()),
    );

    assert!(!consumer.ready().is_ready());
    assert!(!consumer.clone().ready().is_ready());
}

#[tokio::test]
async fn test_cloned_consumers_share_channel() {
    let store = InMemoryStore::new();
    let handler = Arc::new(RecordingHandler::default());
    let (consumer, tx, metrics) = build_consumer(Arc::new(store.clone()), handler.clone());
    let token = CancellationToken::new();

    let mut handles = Vec::new();
    for worker in [consumer.clone(), consumer] {
        let token = token.clone();
        handles.push(tokio::spawn(async move { worker.run(token).await }));
    }

    for i in 0..6 {
        let message = Message::new(format!("m{i}"));
        store.insert(&message).await.unwrap();
        tx.send(message, &token).await.unwrap();
    }
    drop(tx);

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(handler.seen().len(), 6);
    assert_eq!(metrics.snapshot().messages_processed, 6);
    assert!(store.find_unprocessed(10).await.unwrap().is_empty());
}
