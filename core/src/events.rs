//! # Chain Event Bus
//!
//! Fire-and-forget publication of chain events: one `NewBlock` and one
//! `Messages` event per committed block. Built on a tokio broadcast
//! channel so any number of subscribers (sync loop, RPC, indexer) can
//! listen without coordinating with the committer.
//!
//! Delivery is best-effort by design. No subscribers means the send
//! result is ignored; a slow subscriber lags and drops old events
//! rather than backpressuring the commit path.

use tokio::sync::broadcast;

use crate::chain::block::Block;
use crate::executor::Message;

/// Events published by the chain manager at commit time.
#[derive(Clone, Debug)]
pub enum ChainEvent {
    /// A block was committed to the canonical chain.
    NewBlock(Block),
    /// The messages that block's state transition emitted.
    Messages(Vec<Message>),
}

/// Broadcast bus for [`ChainEvent`]s.
///
/// Cloning the bus clones the sender; every clone posts into the same
/// channel. Subscribers receive events published after they subscribe.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<ChainEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Fire-and-forget: an error here only means
    /// nobody is listening, which is fine.
    pub fn post(&self, event: ChainEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        // Enough for a deep reorg's worth of blocks before a lagging
        // subscriber starts missing events.
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posting_without_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.post(ChainEvent::NewBlock(Block::genesis()));
    }

    #[tokio::test]
    async fn subscriber_receives_events_in_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.post(ChainEvent::NewBlock(Block::genesis()));
        bus.post(ChainEvent::Messages(Vec::new()));

        assert!(matches!(rx.recv().await, Ok(ChainEvent::NewBlock(_))));
        assert!(matches!(rx.recv().await, Ok(ChainEvent::Messages(m)) if m.is_empty()));
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let bus = EventBus::default();
        bus.post(ChainEvent::NewBlock(Block::genesis()));

        let mut rx = bus.subscribe();
        bus.post(ChainEvent::Messages(Vec::new()));
        assert!(matches!(rx.recv().await, Ok(ChainEvent::Messages(_))));
    }
}
