use crate::topic::MessageKind;
use futures::future::BoxFuture;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// One inbound transport message, routed by its topic-derived device id.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub device_id: String,
    pub kind: MessageKind,
    pub payload: Vec<u8>,
}

pub type MessageHandler = Arc<dyn Fn(InboundMessage) -> BoxFuture<'static, ()> + Send + Sync>;

/// Sharded worker pool keyed on device id. Messages for the same device are
/// processed in arrival order by a single worker, which keeps the
/// previous-reading comparison causally correct per vehicle (a device links
/// to at most one vehicle). Queues are bounded: a saturated shard drops the
/// message rather than buffering without limit.
pub struct ShardedDispatcher {
    senders: Vec<mpsc::Sender<InboundMessage>>,
    workers: Vec<JoinHandle<()>>,
}

impl ShardedDispatcher {
    pub fn new(shards: usize, queue_depth: usize, handler: MessageHandler) -> Self {
        assert!(shards > 0, "dispatcher needs at least one shard");

        let mut senders = Vec::with_capacity(shards);
        let mut workers = Vec::with_capacity(shards);

        for shard in 0..shards {
            let (tx, mut rx) = mpsc::channel::<InboundMessage>(queue_depth);
            let handler = Arc::clone(&handler);
            senders.push(tx);
            workers.push(tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    handler(message).await;
                }
                debug!(shard, "ingest worker stopped");
            }));
        }

        Self { senders, workers }
    }

    /// Route a message to its device's shard. Never blocks the caller.
    pub fn dispatch(&self, message: InboundMessage) {
        let shard = shard_for(&message.device_id, self.senders.len());
        match self.senders[shard].try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(message)) => {
                warn!(
                    device_id = %message.device_id,
                    shard,
                    "ingest queue saturated, dropping message"
                );
            }
            Err(mpsc::error::TrySendError::Closed(message)) => {
                error!(
                    device_id = %message.device_id,
                    shard,
                    "ingest worker gone, dropping message"
                );
            }
        }
    }

    /// Close the queues and wait for in-flight messages to drain.
    pub async fn shutdown(self) {
        drop(self.senders);
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!(error = %e, "ingest worker panicked");
            }
        }
    }
}

fn shard_for(device_id: &str, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    device_id.hash(&mut hasher);
    (hasher.finish() % shards as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::Mutex;

    fn message(device_id: &str, sequence: u8) -> InboundMessage {
        InboundMessage {
            device_id: device_id.to_string(),
            kind: MessageKind::Data,
            payload: vec![sequence],
        }
    }

    #[test]
    fn test_shard_for_is_stable() {
        let first = shard_for("dev_abc", 8);
        assert_eq!(first, shard_for("dev_abc", 8));
        assert!(first < 8);
    }

    #[tokio::test]
    async fn test_same_device_preserves_order() {
        let seen: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: MessageHandler = Arc::new(move |msg: InboundMessage| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(msg.payload[0]);
            }
            .boxed()
        });

        let dispatcher = ShardedDispatcher::new(4, 64, handler);
        for sequence in 0..20 {
            dispatcher.dispatch(message("dev_abc", sequence));
        }
        dispatcher.shutdown().await;

        assert_eq!(*seen.lock().unwrap(), (0..20).collect::<Vec<u8>>());
    }

    #[tokio::test]
    async fn test_saturated_queue_drops_instead_of_blocking() {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let handled = Arc::new(Mutex::new(0usize));

        let gate_ref = Arc::clone(&gate);
        let handled_ref = Arc::clone(&handled);
        let handler: MessageHandler = Arc::new(move |_msg: InboundMessage| {
            let gate = Arc::clone(&gate_ref);
            let handled = Arc::clone(&handled_ref);
            async move {
                let _permit = gate.acquire().await.unwrap();
                *handled.lock().unwrap() += 1;
            }
            .boxed()
        });

        let dispatcher = ShardedDispatcher::new(1, 2, handler);
        // Worker blocks on the first message; queue holds two more; the rest
        // must be dropped without blocking this call.
        for sequence in 0..10 {
            dispatcher.dispatch(message("dev_abc", sequence));
        }

        gate.add_permits(100);
        dispatcher.shutdown().await;

        let handled = *handled.lock().unwrap();
        assert!(handled <= 3, "expected drops, handled {}", handled);
        assert!(handled >= 1);
    }
}
