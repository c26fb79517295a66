//! Lock-free order queue between the control thread and the audio thread
//!
//! Two independent instances exist per engine:
//! - control → audio: "apply this processing order"
//! - audio → control: "this is the order to display" (echo after a restore)
//!
//! # Real-Time Safety
//!
//! The `rtrb` ringbuffer is allocated once at construction. Both `push` and
//! `pull` are wait-free and O(1); neither blocks nor allocates. The producer
//! and consumer halves are separate types that are `Send` but not `Clone`,
//! so each direction has exactly one writer and one reader.
//!
//! # Usage
//!
//! ```ignore
//! let (tx, rx) = order_queue(ORDER_QUEUE_CAPACITY);
//!
//! // Control thread
//! if !tx.push(order) {
//!     log::debug!("order queue full, request dropped");
//! }
//!
//! // Audio thread, once per callback
//! while let Some(order) = rx.pull() { /* keep the latest */ }
//! ```

use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::order::ProcessingOrder;

/// Default order queue capacity
///
/// Reorders are user-driven (a click or drag), so even a very slow audio
/// callback never sees more than a handful between two drains.
pub const ORDER_QUEUE_CAPACITY: usize = 100;

/// Create a connected producer/consumer pair with a fixed capacity
///
/// A capacity of zero is raised to one.
pub fn order_queue(capacity: usize) -> (OrderSender, OrderReceiver) {
    let capacity = capacity.max(1);
    let (producer, consumer) = RingBuffer::new(capacity);
    (
        OrderSender { producer, capacity },
        OrderReceiver { consumer },
    )
}

/// Writing half of an order queue
pub struct OrderSender {
    producer: Producer<ProcessingOrder>,
    capacity: usize,
}

impl OrderSender {
    /// Enqueue an order
    ///
    /// Returns `false` and drops the value if the queue is full; unread
    /// entries are never overwritten.
    pub fn push(&mut self, order: ProcessingOrder) -> bool {
        match self.producer.push(order) {
            Ok(()) => true,
            Err(PushError::Full(_)) => false,
        }
    }

    /// Number of entries waiting to be read
    pub fn available_for_reading(&self) -> usize {
        self.capacity - self.producer.slots()
    }

    /// Free slots left for writing
    pub fn available_for_writing(&self) -> usize {
        self.producer.slots()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when the consumer half has been dropped
    pub fn is_abandoned(&self) -> bool {
        self.producer.is_abandoned()
    }
}

/// Reading half of an order queue
pub struct OrderReceiver {
    consumer: Consumer<ProcessingOrder>,
}

impl OrderReceiver {
    /// Dequeue the oldest order, or `None` if nothing is waiting
    #[inline]
    pub fn pull(&mut self) -> Option<ProcessingOrder> {
        self.consumer.pop().ok()
    }

    /// Number of entries waiting to be read
    #[inline]
    pub fn available_for_reading(&self) -> usize {
        self.consumer.slots()
    }

    /// Drain everything, returning only the most recent entry
    pub fn pull_latest(&mut self) -> Option<ProcessingOrder> {
        let mut latest = None;
        while let Some(order) = self.pull() {
            latest = Some(order);
        }
        latest
    }
}
