use crate::negotiation::{ConnectionEvent, MessageProducer};
use crate::transport::MessageChannel;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Send `producer()` over `channel` every `interval` until cancelled.
///
/// The first message goes out one interval after the channel opens. A failed
/// send ends the loop and is reported as [`ConnectionEvent::MessageLoopStopped`].
pub fn spawn_message_loop(
    channel: Arc<dyn MessageChannel>,
    producer: MessageProducer,
    interval: Duration,
    cancel: CancellationToken,
    events: broadcast::Sender<ConnectionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let label = channel.label();
        info!("Message loop started on '{}' every {:?}", label, interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let error = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break None,

                _ = ticker.tick() => {
                    let message = producer();
                    debug!("Sending '{}' on '{}'", message, label);
                    if let Err(e) = channel.send_text(message).await {
                        warn!("Message loop on '{}' stopped: {}", label, e);
                        break Some(e.to_string());
                    }
                }
            }
        };

        info!("Message loop on '{}' finished", label);
        let _ = events.send(ConnectionEvent::MessageLoopStopped { error });
    })
}
