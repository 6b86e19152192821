/// Shutdown signalling shared by the signal handler, receiver and dispatcher
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use rumqttc::AsyncClient;
use tokio::sync::mpsc::UnboundedSender;

use crate::models::QueueItem;

#[derive(Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

struct Inner {
    triggered: AtomicBool,
    queue: UnboundedSender<QueueItem>,
    client: Option<AsyncClient>,
}

impl Shutdown {
    pub fn new(queue: UnboundedSender<QueueItem>, client: Option<AsyncClient>) -> Self {
        Shutdown {
            inner: Arc::new(Inner {
                triggered: AtomicBool::new(false),
                queue,
                client,
            }),
        }
    }

    /// Request shutdown. Only the first call has any effect.
    ///
    /// Sets the flag, pushes the sentinel so an idle dispatcher wakes up,
    /// and asks the MQTT client to disconnect. Nothing here blocks or awaits.
    pub fn trigger(&self) {
        if self.inner.triggered.swap(true, Ordering::SeqCst) {
            return;
        }

        if self.inner.queue.send(QueueItem::Shutdown).is_err() {
            debug!("Dispatcher queue already closed");
        }

        if let Some(client) = &self.inner.client {
            if let Err(e) = client.try_disconnect() {
                debug!("MQTT disconnect request failed: {}", e);
            }
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }
}
