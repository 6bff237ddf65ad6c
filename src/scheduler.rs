//! Deterministic scheduling
//!
//! All deferred work in Solfa (note auto-stop, voice disposal, sequence
//! playback, autosave) goes through a [`TaskQueue`] keyed by a virtual clock
//! tick. The audio engine ticks in samples, the session ticks in frame
//! milliseconds. Nothing here reads the wall clock, so timing logic runs the
//! same way in tests as in a live host.
//!
//! Tasks never get cancelled in place. A task carries whatever token
//! (generation, epoch) it needs to recognise that the state it was scheduled
//! against has moved on; the consumer checks the token when the task comes
//! due and drops it if stale.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Monotonic virtual clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualClock {
    now: u64,
}

impl VirtualClock {
    /// Create a clock at tick 0
    pub fn new() -> Self {
        Self { now: 0 }
    }

    /// Current tick
    #[inline]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Advance by `ticks`
    pub fn advance(&mut self, ticks: u64) -> u64 {
        self.now = self.now.saturating_add(ticks);
        self.now
    }

    /// Move the clock forward to `tick`. Moving backwards is ignored.
    pub fn advance_to(&mut self, tick: u64) -> u64 {
        if tick > self.now {
            self.now = tick;
        }
        self.now
    }
}

#[derive(Debug)]
struct Scheduled<T> {
    due: u64,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    // BinaryHeap is a max-heap; invert so the earliest (then first inserted) pops first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of tasks ordered by due tick, FIFO among equal ticks.
#[derive(Debug)]
pub struct TaskQueue<T> {
    heap: BinaryHeap<Scheduled<T>>,
    next_seq: u64,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskQueue<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Schedule `task` to run at tick `due`
    pub fn schedule(&mut self, due: u64, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { due, seq, task });
    }

    /// Tick of the earliest pending task
    pub fn next_due(&self) -> Option<u64> {
        self.heap.peek().map(|s| s.due)
    }

    /// Pop the earliest task if it is due at or before `now`
    pub fn pop_due(&mut self, now: u64) -> Option<(u64, T)> {
        if self.heap.peek().is_some_and(|s| s.due <= now) {
            self.heap.pop().map(|s| (s.due, s.task))
        } else {
            None
        }
    }

    /// Pop every task due at or before `now`, in execution order
    pub fn drain_due(&mut self, now: u64) -> Vec<(u64, T)> {
        let mut due = Vec::new();
        while let Some(entry) = self.pop_due(now) {
            due.push(entry);
        }
        due
    }

    /// Number of pending tasks (stale ones included)
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop every pending task
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Keep only the pending tasks for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.heap.retain(|s| keep(&s.task));
    }
}
