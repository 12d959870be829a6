//! Notification surface of the engine.
//!
//! Events are collected inside the exclusive section and dispatched on a
//! background thread after it is released, so a listener that calls back into
//! an engine query cannot deadlock it.

use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use crate::crypto::PublicKey;
use crate::types::Height;

#[derive(Clone, Debug)]
pub enum Event {
    /// The current committee was replaced (normal rotation or force change).
    CommitteeChanged { height: Height },
    /// The set of peers the node should keep connections to changed.
    PeersNeedReconnect(Vec<PublicKey>),
}

pub trait Notifier: Send + Sync {
    fn notify(&self, event: Event);
}

/// Discards every event. Useful for replay and tests.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: Event) {}
}

/// Forwards events into an mpsc channel owned by the host.
pub struct ChannelNotifier {
    tx: Sender<Event>,
}

impl ChannelNotifier {
    pub fn new(tx: Sender<Event>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: Event) {
        // A disconnected receiver just means the host stopped listening.
        let _ = self.tx.send(event);
    }
}

/// Hands the pending events to the notifier off-thread.
pub(crate) fn dispatch(notifier: Arc<dyn Notifier>, events: Vec<Event>) {
    if events.is_empty() {
        return;
    }
    thread::spawn(move || {
        for event in events {
            notifier.notify(event);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn channel_notifier_delivers_in_order() {
        let (tx, rx) = mpsc::channel();
        let notifier: Arc<dyn Notifier> = Arc::new(ChannelNotifier::new(tx));
        dispatch(
            notifier,
            vec![
                Event::CommitteeChanged { height: 5 },
                Event::PeersNeedReconnect(vec![]),
            ],
        );

        match rx.recv_timeout(Duration::from_secs(2)).unwrap() {
            Event::CommitteeChanged { height } => assert_eq!(height, 5),
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.recv_timeout(Duration::from_secs(2)).unwrap() {
            Event::PeersNeedReconnect(list) => assert!(list.is_empty()),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
