//! Queues between stages.
//!
//! Every queue is an unbounded crossbeam channel carrying `Message<T>`. The
//! producing side is wrapped in an `Outbox`, which puts exactly one `Stop`
//! on the queue: on `close()` or, failing that, when it is dropped.

use crossbeam_channel::{Receiver, Sender};

use crate::module::error::{NightwatchError, Result};

/// A payload or the end-of-stream marker.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Message<T> {
    Payload(T),
    Stop,
}

/// Consuming side of a queue.
pub type Inbox<T> = Receiver<Message<T>>;

/// Create a new unbounded queue named `name`.
///
pub fn queue<T>(name: &'static str) -> (Outbox<T>, Inbox<T>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (Outbox::new(name, tx), rx)
}

/// Producing side of a queue.
///
pub struct Outbox<T> {
    name: &'static str,
    tx: Sender<Message<T>>,
    closed: bool,
}

impl<T> Outbox<T> {
    fn new(name: &'static str, tx: Sender<Message<T>>) -> Self {
        Self {
            name,
            tx,
            closed: false,
        }
    }

    /// Enqueue a payload. Never blocks.
    pub fn send(&self, payload: T) -> Result<()> {
        if self.closed {
            return Err(NightwatchError::QueueClosed(self.name));
        }
        self.tx
            .send(Message::Payload(payload))
            .map_err(|_| NightwatchError::QueueClosed(self.name))
    }

    /// Enqueue `Stop`. Further calls do nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // A consumer that is already gone needs no stop.
        if self.tx.send(Message::Stop).is_err() {
            log::debug!("{} consumer already gone", self.name);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<T> Drop for Outbox<T> {
    fn drop(&mut self) {
        if !self.is_closed() {
            log::debug!("{} closed on drop", self.name);
        }
        self.close();
    }
}

/// Read-only view on the depth of a queue.
///
/// Holds a sender clone but never sends on it, so the queue still
/// disconnects once its consumer is dropped.
pub struct QueueDepth<T> {
    tx: Sender<Message<T>>,
}

impl<T> QueueDepth<T> {
    pub fn new(outbox: &Outbox<T>) -> Self {
        Self {
            tx: outbox.tx.clone(),
        }
    }

    /// Number of messages waiting in the queue.
    pub fn depth(&self) -> usize {
        self.tx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_and_single_stop_test() {
        let (mut tx, rx) = queue::<u32>("numbers");
        tx.send(1).unwrap();
        tx.send(2).unwrap();
        tx.close();
        tx.close();
        assert!(tx.send(3).is_err());
        drop(tx);
        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![Message::Payload(1), Message::Payload(2), Message::Stop]
        );
    }

    #[test]
    fn drop_sends_stop_test() {
        let (tx, rx) = queue::<u32>("numbers");
        let view = QueueDepth::new(&tx);
        tx.send(7).unwrap();
        assert_eq!(view.depth(), 1);
        drop(tx);
        assert_eq!(view.depth(), 2);
        assert_eq!(rx.recv().unwrap(), Message::Payload(7));
        assert_eq!(rx.recv().unwrap(), Message::Stop);
    }

    #[test]
    fn send_to_gone_consumer_test() {
        let (tx, rx) = queue::<u32>("numbers");
        drop(rx);
        assert!(matches!(
            tx.send(1),
            Err(NightwatchError::QueueClosed("numbers"))
        ));
    }

    #[test]
    fn depth_view_does_not_keep_queue_open_test() {
        let (tx, rx) = queue::<u32>("numbers");
        let view = QueueDepth::new(&tx);
        tx.send(1).unwrap();
        drop(rx);
        assert!(matches!(
            tx.send(2),
            Err(NightwatchError::QueueClosed("numbers"))
        ));
        assert_eq!(view.depth(), 0);
    }
}
