/// Input events the map understands, in screen pixels relative to the map element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A press began at (x, y).
    PointerDown { x: f64, y: f64 },
    /// A press ended at (x, y).
    PointerUp { x: f64, y: f64 },
    /// The pointer moved to (x, y), pressed or not.
    PointerMove { x: f64, y: f64 },
    /// The pointer left the map element.
    PointerLeave,
    /// The unzoom button was pressed.
    Unzoom,
}

/// A queue of input events.
/// The host pushes events as they arrive; the session drains them at the start of each frame.
#[derive(Debug)]
pub struct InputQueue {
    events: Vec<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(32),
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Drain all pending events in arrival order.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_drain_keeps_order() {
        let mut q = InputQueue::new();
        q.push(InputEvent::PointerDown { x: 10.0, y: 20.0 });
        q.push(InputEvent::PointerUp { x: 10.0, y: 20.0 });
        q.push(InputEvent::Unzoom);
        assert_eq!(q.len(), 3);
        let events = q.drain();
        assert_eq!(events[0], InputEvent::PointerDown { x: 10.0, y: 20.0 });
        assert_eq!(events[2], InputEvent::Unzoom);
        assert!(q.is_empty());
    }
}
