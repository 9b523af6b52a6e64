//! Delivery event sinks: where normalized delivery reports are handed off.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::domain::{DeliveryEvent, ProviderId};

/// Write-only target for delivery events.
///
/// Implementations own loss and backpressure handling; `record` must not block on I/O.
pub trait DeliverySink: Send + Sync {
    fn record(&self, provider: &ProviderId, event: DeliveryEvent);
}

/// Logs each event as a structured `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DeliverySink for TracingSink {
    fn record(&self, provider: &ProviderId, event: DeliveryEvent) {
        info!(
            provider = %provider,
            msgid = event.message_id(),
            recipient = event.recipient(),
            status = event.status_code(),
            send_time = %event.sent_at(),
            receive_time = %event.delivered_at(),
            delay_ms = event.delay().as_millis() as u64,
            "metrics"
        );
    }
}

/// Forwards events to a consumer task over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(ProviderId, DeliveryEvent)>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(ProviderId, DeliveryEvent)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DeliverySink for ChannelSink {
    fn record(&self, provider: &ProviderId, event: DeliveryEvent) {
        if let Err(err) = self.tx.send((provider.clone(), event)) {
            let (_, event) = err.0;
            warn!(
                provider = %provider,
                msgid = event.message_id(),
                "delivery event dropped: receiver closed"
            );
        }
    }
}
