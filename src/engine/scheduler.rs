use std::cmp::Ordering;
use std::collections::BinaryHeap;

/*
Deferred actions
================

Everything that has to happen "later" (voice teardowns, sequencer ticks,
step note-ons and note-offs) goes into a `Scheduler`: a min-heap keyed on
(deadline, sequence). The sequence number is handed out at registration, so
two actions due at the same instant come out in the order they went in.

Nothing runs by itself. The engine asks for `next_deadline()` to decide where
to split the next audio block, renders up to there, then drains everything
`pop_due(now)` hands back.

Cancelling is by `EventId`. It's a linear scan, which is fine for the handful
of pending entries a synth keeps.
*/

/// Handle to a scheduled action, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u64);

struct Entry<A> {
    deadline: f64,
    seq: u64,
    action: A,
}

impl<A> PartialEq for Entry<A> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<A> Eq for Entry<A> {}

impl<A> PartialOrd for Entry<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A> Ord for Entry<A> {
    // Reversed: BinaryHeap is a max-heap, the earliest entry must be on top
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .total_cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct Scheduler<A> {
    heap: BinaryHeap<Entry<A>>,
    next_seq: u64,
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, deadline: f64, action: A) -> EventId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry {
            deadline,
            seq,
            action,
        });
        EventId(seq)
    }

    /// Remove a pending action. Returns false if it already ran or was
    /// cancelled.
    pub fn cancel(&mut self, id: EventId) -> bool {
        let before = self.heap.len();
        self.heap.retain(|entry| entry.seq != id.0);
        self.heap.len() != before
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.heap.peek().map(|entry| entry.deadline)
    }

    /// Pop the earliest action if its deadline has been reached.
    pub fn pop_due(&mut self, now: f64) -> Option<(f64, A)> {
        if self.heap.peek()?.deadline > now {
            return None;
        }
        self.heap.pop().map(|entry| (entry.deadline, entry.action))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}
