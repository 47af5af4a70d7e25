//! Interruption queue
//!
//! FIFO of pending human interactions. Cloning the queue yields another
//! handle to the same storage, which is how the interaction channel's
//! callback and the control loop share it.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use sdk::types::InteractionEvent;

#[derive(Debug, Clone, Default)]
pub struct InterruptionQueue {
    inner: Arc<Mutex<VecDeque<InteractionEvent>>>,
}

impl InterruptionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue at the tail
    pub fn push_back(&self, event: InteractionEvent) {
        self.inner.lock().push_back(event);
    }

    /// Put an event back at the head, ahead of everything queued after it
    pub fn push_front(&self, event: InteractionEvent) {
        self.inner.lock().push_front(event);
    }

    pub fn pop_front(&self) -> Option<InteractionEvent> {
        self.inner.lock().pop_front()
    }

    pub fn peek_front(&self) -> Option<InteractionEvent> {
        self.inner.lock().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
