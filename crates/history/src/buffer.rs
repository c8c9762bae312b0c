use std::collections::VecDeque;

/// Upper bound on the slots reserved up front.
const PREALLOC_LIMIT: usize = 1024;

/// Fixed-capacity window over the most recent items.
///
/// When full, the oldest element is evicted on each push. Iteration order is
/// oldest to newest.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer. A zero capacity keeps nothing.
    ///
    /// Storage grows on demand, so `capacity` may be arbitrarily large.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity.min(PREALLOC_LIMIT)),
            capacity,
        }
    }

    /// Push a value, evicting the oldest entry when at capacity.
    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Consumes the buffer, oldest first.
    pub fn into_vec(self) -> Vec<T> {
        self.buf.into()
    }
}
