// Input buffering: ordered queue of pending discrete inputs

use std::collections::VecDeque;

/// Default maximum number of buffered inputs to store
pub const MAX_BUFFER_SIZE: usize = 30;

/// Bounded first-in first-out input buffer.
///
/// Inputs are consumed one at a time in arrival order. When full, the oldest
/// pending input is discarded to make room for the newest.
#[derive(Debug, Clone)]
pub struct InputBuffer<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> InputBuffer<T> {
    /// Create a new input buffer with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFER_SIZE)
    }

    /// Create a buffer holding at most `capacity` inputs (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add an input to the back of the buffer.
    /// Returns the input that was evicted to make room, if any.
    pub fn push(&mut self, input: T) -> Option<T> {
        let evicted = if self.buffer.len() >= self.capacity {
            self.buffer.pop_front()
        } else {
            None
        };
        self.buffer.push_back(input);
        evicted
    }

    /// Consume the oldest buffered input
    pub fn pop(&mut self) -> Option<T> {
        self.buffer.pop_front()
    }

    /// Peek at the oldest buffered input
    pub fn peek(&self) -> Option<&T> {
        self.buffer.front()
    }

    /// Clear all buffered inputs
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Get the number of buffered inputs
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Maximum number of inputs held at once
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for InputBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
