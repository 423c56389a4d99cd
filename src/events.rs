use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    EndOfStream,
    Error(String),
}

/// Everything that reaches the controller from outside the UI thread.
#[derive(Debug)]
pub enum ControlEvent {
    Engine(EngineEvent),
    PositionTick(TickToken),
}

/// Held by an undelivered or unhandled poller tick; dropping it frees the slot.
#[derive(Debug)]
pub struct TickToken {
    in_flight: Arc<AtomicBool>,
}

impl TickToken {
    pub fn acquire(in_flight: &Arc<AtomicBool>) -> Option<Self> {
        in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                in_flight: Arc::clone(in_flight),
            })
    }
}

impl Drop for TickToken {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<ControlEvent>,
}

impl EventSender {
    /// Returns false once the control loop has gone away.
    pub fn engine(&self, event: EngineEvent) -> bool {
        self.tx.send(ControlEvent::Engine(event)).is_ok()
    }

    pub fn tick(&self, token: TickToken) -> bool {
        self.tx.send(ControlEvent::PositionTick(token)).is_ok()
    }
}

pub fn channel() -> (EventSender, Receiver<ControlEvent>) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, rx)
}
