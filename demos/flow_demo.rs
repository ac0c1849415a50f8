use qflow::{
    create_flow_limit, set_defaults, FlowEvent, FlowObserver, Message, QueueDescriptor,
    QueueSettings, QueuedMessage, ReceiveCompletion,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct LogObserver;

impl FlowObserver for LogObserver {
    fn on_event(&self, event: &FlowEvent) {
        tracing::info!("observer: {:?}", event);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    // 64 KiB queues stop producers at 80% and let them go again below 50%.
    set_defaults(64 * 1024, 80, 50)?;

    let limit = create_flow_limit(&QueueDescriptor::new("demo.orders"), &QueueSettings::new())?
        .ok_or("defaults should have produced a flow limit")?;
    let limit = Arc::new(limit);
    limit.set_observer(Arc::new(LogObserver));
    tracing::info!("{}{}", limit.queue_name(), limit);

    let (queue_tx, mut queue_rx) = mpsc::unbounded_channel::<QueuedMessage>();

    let mut producers = Vec::new();
    for p in 0..4u64 {
        let limit = limit.clone();
        let queue_tx = queue_tx.clone();
        producers.push(tokio::spawn(async move {
            for i in 0..32u64 {
                let completion = ReceiveCompletion::new();
                let msg = QueuedMessage::new(p * 1000 + i, Arc::new(Message::new(1024, completion.clone())));
                limit.enqueued(&msg);
                if queue_tx.send(msg).is_err() {
                    break;
                }
                // A real session would ack the publish here.
                completion.wait().await;
            }
        }));
    }
    drop(queue_tx);

    let consumer = {
        let limit = limit.clone();
        tokio::spawn(async move {
            // Let the producers fill the queue before draining slowly.
            tokio::time::sleep(Duration::from_millis(100)).await;
            let mut consumed = 0usize;
            while let Some(msg) = queue_rx.recv().await {
                limit.dequeued(&msg)?;
                consumed += 1;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            Ok::<_, qflow::FlowError>(consumed)
        })
    };

    for p in producers {
        p.await?;
    }
    let consumed = consumer.await??;

    tracing::info!("consumed {} messages{}", consumed, limit);
    Ok(())
}
