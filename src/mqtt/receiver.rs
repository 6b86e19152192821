/// MQTT receive side: drives the event loop and only enqueues messages
use log::{debug, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, Packet, Publish, QoS};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{sleep, Duration};

use crate::models::{QueueItem, RawEnvelope};
use crate::shutdown::Shutdown;

const RETRY_PAUSE_SECS: u64 = 1;

/// Push one incoming publish onto the dispatcher queue.
///
/// Returns false once the dispatcher side has gone away.
pub fn forward_publish(queue: &UnboundedSender<QueueItem>, publish: Publish) -> bool {
    let envelope = RawEnvelope::new(publish.topic, publish.payload.to_vec());
    queue.send(QueueItem::Message(envelope)).is_ok()
}

/// Poll the MQTT event loop until shutdown, forwarding every publish.
///
/// Decoding never happens here, so a slow consumer cannot stall the
/// connection's keep-alive handling.
pub async fn run_receiver(
    mut event_loop: EventLoop,
    client: AsyncClient,
    topic: String,
    queue: UnboundedSender<QueueItem>,
    shutdown: Shutdown,
) {
    info!("MQTT receiver started");

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!(
                    "Received {} bytes on {}",
                    publish.payload.len(),
                    publish.topic
                );
                if !forward_publish(&queue, publish) {
                    debug!("Dispatcher queue closed");
                    break;
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Reconnected to MQTT broker, subscribing to {}", topic);
                if let Err(e) = client.try_subscribe(topic.as_str(), QoS::AtMostOnce) {
                    warn!("Failed to resubscribe to {}: {}", topic, e);
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("MQTT disconnect sent");
                break;
            }
            Ok(event) => debug!("MQTT event: {:?}", event),
            Err(e) => {
                if shutdown.is_triggered() {
                    break;
                }
                warn!("MQTT connection error: {}", e);
                sleep(Duration::from_secs(RETRY_PAUSE_SECS)).await;
            }
        }
    }

    info!("MQTT receiver stopped");
}
