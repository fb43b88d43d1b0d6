//! Bounded, credit-based FIFO: the sole synchronization primitive between
//! pipeline stages.
//!
//! A slot's credit is held from `add` through to the consumer's explicit
//! `release` — not merely until the item is dequeued. This matters for links
//! like dispatch -> execute, where a functional unit occupies a slot for its
//! full latency before broadcasting and freeing the credit, not just for the
//! cycle it was handed the operation.
//!
//! Because the pipeline is driven by explicit per-cycle `tick()` calls rather
//! than OS threads (see the design notes), the blocking operations in the
//! original description (`add` blocks until a credit is free, `take` blocks
//! until an item is available) are expressed here as non-blocking
//! `try_add`/`try_take`: a stage that cannot make progress this cycle simply
//! defers to the next tick instead of parking.

use std::collections::VecDeque;

/// A fixed-capacity FIFO with credits held until the consumer releases them.
#[derive(Debug)]
pub struct BoundedChannel<T> {
    queue: VecDeque<T>,
    capacity: usize,
    in_flight: usize,
    closed: bool,
}

impl<T> BoundedChannel<T> {
    /// Creates a new, empty, open channel with the given capacity. A
    /// capacity of `0` means unbounded (used for the execute -> writeback
    /// link, per the design).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { queue: VecDeque::new(), capacity, in_flight: 0, closed: false }
    }

    /// Creates an unbounded channel.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Attempts to enqueue `item`. Fails (returning the item back) if the
    /// channel is closed or has no free credit.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` when the channel is closed or full.
    pub fn try_add(&mut self, item: T) -> Result<(), T> {
        if self.closed || self.is_full() {
            return Err(item);
        }
        self.queue.push_back(item);
        Ok(())
    }

    /// Attempts to dequeue the oldest item. The credit for that item remains
    /// held (counted against capacity) until [`release`](Self::release) is
    /// called. Returns `None` if the queue is empty (whether or not closed —
    /// a closed, empty channel is a "not running" signal to the consumer).
    pub fn try_take(&mut self) -> Option<T> {
        let item = self.queue.pop_front()?;
        self.in_flight += 1;
        Some(item)
    }

    /// Returns one credit to the channel. Called by the consumer once it has
    /// finished with an item it previously took.
    pub fn release(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    /// Closes the channel: wakes all readers with a "not running" signal
    /// (modeled here as `try_take` returning `None` once the queue drains)
    /// and causes subsequent `try_add` calls to be silently dropped.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Reopens a previously closed channel and clears any queued items and
    /// outstanding credits — used when recovery re-initializes a stage.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.in_flight = 0;
        self.closed = false;
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the channel currently has no spare credit. Unbounded
    /// channels (`capacity == 0`) are never full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.capacity != 0 && self.queue.len() + self.in_flight >= self.capacity
    }

    /// Whether the queue (not counting in-flight items) is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of items currently queued (not counting in-flight items).
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Configured capacity (`0` means unbounded).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates over queued items without dequeuing them, oldest first.
    /// Used by the orchestrator to attribute stage-occupancy events without
    /// disturbing the channel's own credit bookkeeping.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.queue.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_take_round_trips() {
        let mut ch = BoundedChannel::new(2);
        ch.try_add(1).expect("has credit");
        assert_eq!(ch.try_take(), Some(1));
    }

    #[test]
    fn full_channel_rejects_add() {
        let mut ch = BoundedChannel::new(1);
        ch.try_add(1).expect("first add succeeds");
        assert_eq!(ch.try_add(2), Err(2));
    }

    #[test]
    fn credit_stays_held_until_release() {
        let mut ch = BoundedChannel::new(1);
        ch.try_add(1).expect("add");
        let taken = ch.try_take().expect("take");
        assert_eq!(taken, 1);
        assert!(ch.is_full());
        assert_eq!(ch.try_add(2), Err(2));
        ch.release();
        assert!(!ch.is_full());
        ch.try_add(2).expect("add after release");
    }

    #[test]
    fn closed_channel_drops_adds_silently() {
        let mut ch = BoundedChannel::new(4);
        ch.close();
        assert_eq!(ch.try_add(1), Err(1));
    }

    #[test]
    fn closed_empty_channel_reads_as_not_running() {
        let mut ch: BoundedChannel<u32> = BoundedChannel::new(4);
        ch.close();
        assert_eq!(ch.try_take(), None);
    }

    #[test]
    fn unbounded_channel_never_reports_full() {
        let mut ch = BoundedChannel::new(0);
        for i in 0..1000 {
            ch.try_add(i).expect("unbounded accepts everything");
        }
        assert!(!ch.is_full());
    }

    #[test]
    fn iter_exposes_queued_items_without_taking_them() {
        let mut ch = BoundedChannel::new(4);
        ch.try_add(1).expect("add");
        ch.try_add(2).expect("add");
        assert_eq!(ch.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(ch.len(), 2);
    }

    #[test]
    fn reset_clears_queue_credits_and_closed_flag() {
        let mut ch = BoundedChannel::new(1);
        ch.try_add(1).expect("add");
        ch.close();
        ch.reset();
        assert!(!ch.is_closed());
        assert!(!ch.is_full());
        ch.try_add(2).expect("usable again after reset");
    }
}
