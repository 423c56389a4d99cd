use crate::audio::MediaEngine;
use crate::controller::PlaybackController;
use crate::events::{EventSender, TickToken};
use crate::model::PlayState;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("position poller thread panicked")]
    Panicked,
}

/// Background ticker that asks the control loop to refresh position/duration.
///
/// At most one tick is ever in flight: while the control loop still holds the
/// previous [`TickToken`], further ticks are dropped rather than queued.
pub struct PositionPoller {
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PositionPoller {
    pub fn spawn(interval: Duration, events: EventSender) -> std::io::Result<Self> {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let in_flight = Arc::new(AtomicBool::new(false));

        let handle = thread::Builder::new()
            .name(String::from("position-poller"))
            .spawn(move || {
                loop {
                    match cancel_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            let Some(token) = TickToken::acquire(&in_flight) else {
                                trace!("previous tick still pending, skipping");
                                continue;
                            };
                            if !events.tick(token) {
                                break;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("position poller stopped");
            })?;

        Ok(Self {
            cancel: Some(cancel_tx),
            handle: Some(handle),
        })
    }

    /// Stops the ticker and waits for its thread.
    pub fn cancel(mut self) -> Result<(), PollerError> {
        self.stop_thread()
    }

    fn stop_thread(&mut self) -> Result<(), PollerError> {
        drop(self.cancel.take());
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| PollerError::Panicked),
            None => Ok(()),
        }
    }
}

impl Drop for PositionPoller {
    fn drop(&mut self) {
        let _ = self.stop_thread();
    }
}

/// Handles one tick on the control thread.
pub fn sample<E: MediaEngine>(controller: &mut PlaybackController<E>) {
    let engine = controller.engine();
    if engine.query_state() != Some(PlayState::Playing) {
        return;
    }

    let position = engine
        .query_position()
        .map_or(controller.position_seconds(), |d| d.as_secs_f64());
    let duration = engine
        .query_duration()
        .map_or(controller.duration_seconds(), |d| d.as_secs_f64());
    controller.on_position_update(position, duration);
}
