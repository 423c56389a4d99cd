use crate::events::{EngineEvent, EventSender};
use crate::model::PlayState;
use anyhow::{Context, Result};
use rodio::Source;
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
#[cfg(unix)]
use std::ffi::CString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Boundary to the playback engine.
///
/// Commands are fire-and-forget: failures that happen inside the engine are
/// reported later as [`EngineEvent::Error`] on the control queue, and the
/// end of a track as [`EngineEvent::EndOfStream`].
pub trait MediaEngine {
    /// Loads a track and leaves it paused at the start.
    fn load(&mut self, path: &Path);
    fn set_state(&mut self, state: PlayState);
    fn seek_absolute(&mut self, position: Duration);
    fn query_position(&self) -> Option<Duration>;
    fn query_duration(&self) -> Option<Duration>;
    fn query_state(&self) -> Option<PlayState>;
    /// Called from the control loop so the engine can notice end-of-stream.
    fn tick(&mut self);
    fn release(&mut self);
    fn output_name(&self) -> Option<String>;
}

impl<E: MediaEngine + ?Sized> MediaEngine for Box<E> {
    fn load(&mut self, path: &Path) {
        (**self).load(path);
    }

    fn set_state(&mut self, state: PlayState) {
        (**self).set_state(state);
    }

    fn seek_absolute(&mut self, position: Duration) {
        (**self).seek_absolute(position);
    }

    fn query_position(&self) -> Option<Duration> {
        (**self).query_position()
    }

    fn query_duration(&self) -> Option<Duration> {
        (**self).query_duration()
    }

    fn query_state(&self) -> Option<PlayState> {
        (**self).query_state()
    }

    fn tick(&mut self) {
        (**self).tick();
    }

    fn release(&mut self) {
        (**self).release();
    }

    fn output_name(&self) -> Option<String> {
        (**self).output_name()
    }
}

pub struct RodioEngine {
    stream: OutputStream,
    sink: Sink,
    current: Option<PathBuf>,
    track_duration: Option<Duration>,
    end_reported: bool,
    events: EventSender,
}

impl RodioEngine {
    pub fn new(events: EventSender) -> Result<Self> {
        let (stream, sink) = Self::open_output_stream()?;

        Ok(Self {
            stream,
            sink,
            current: None,
            track_duration: None,
            end_reported: false,
            events,
        })
    }

    fn open_output_stream() -> Result<(OutputStream, Sink)> {
        let mut stream = with_silenced_stderr(|| {
            match OutputStreamBuilder::from_default_device()
                .context("failed to open default system output stream")
                .and_then(|builder| {
                    builder
                        .with_error_callback(|_| {})
                        .open_stream_or_fallback()
                        .context("failed to start default output stream")
                }) {
                Ok(stream) => Ok(stream),
                Err(default_err) => {
                    let host = rodio::cpal::default_host();
                    let devices = host
                        .output_devices()
                        .context("failed to enumerate output devices")?;
                    for device in devices {
                        let name = device.name().unwrap_or_default();
                        let opened = OutputStreamBuilder::from_device(device)
                            .context("failed to open fallback output device")
                            .and_then(|builder| {
                                builder
                                    .with_error_callback(|_| {})
                                    .open_stream_or_fallback()
                                    .context("failed to start fallback output stream")
                            });
                        match opened {
                            Ok(stream) => {
                                debug!(device = %name, "opened fallback output device");
                                return Ok(stream);
                            }
                            Err(err) => debug!(device = %name, "output device rejected: {err:#}"),
                        }
                    }
                    Err(default_err.context("unable to start any audio output stream"))
                }
            }
        })?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());
        Ok((stream, sink))
    }

    fn open_source(path: &Path) -> Result<impl Source + Send + 'static> {
        let file =
            File::open(path).with_context(|| format!("failed to open track {}", path.display()))?;
        Decoder::try_from(file).with_context(|| format!("failed to decode {}", path.display()))
    }

    fn reset(&mut self) {
        self.sink.stop();
        self.current = None;
        self.track_duration = None;
        self.end_reported = false;
    }
}

impl MediaEngine for RodioEngine {
    fn load(&mut self, path: &Path) {
        self.reset();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.sink.pause();

        match Self::open_source(path) {
            Ok(source) => {
                self.track_duration = source.total_duration().filter(|d| !d.is_zero());
                self.sink.append(source);
                self.current = Some(path.to_path_buf());
                debug!(path = %path.display(), duration = ?self.track_duration, "track loaded");
            }
            Err(err) => {
                warn!("load failed: {err:#}");
                self.events.engine(EngineEvent::Error(format!("{err:#}")));
            }
        }
    }

    fn set_state(&mut self, state: PlayState) {
        match state {
            PlayState::Playing => {
                if self.current.is_some() {
                    self.sink.play();
                }
            }
            PlayState::Paused => self.sink.pause(),
            PlayState::Stopped => self.reset(),
        }
    }

    fn seek_absolute(&mut self, position: Duration) {
        if self.current.is_none() {
            debug!("seek ignored without an active track");
            return;
        }

        if let Err(err) = self.sink.try_seek(position) {
            self.events
                .engine(EngineEvent::Error(format!("failed to seek: {err:?}")));
        }
    }

    fn query_position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.sink.get_pos())
    }

    fn query_duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn query_state(&self) -> Option<PlayState> {
        if self.current.is_none() || self.sink.empty() {
            return Some(PlayState::Stopped);
        }
        if self.sink.is_paused() {
            Some(PlayState::Paused)
        } else {
            Some(PlayState::Playing)
        }
    }

    fn tick(&mut self) {
        if self.end_reported || self.current.is_none() || self.sink.is_paused() {
            return;
        }
        if self.sink.empty() {
            self.end_reported = true;
            self.events.engine(EngineEvent::EndOfStream);
        }
    }

    fn release(&mut self) {
        self.reset();
    }

    fn output_name(&self) -> Option<String> {
        Some(String::from("System default output (rodio)"))
    }
}

#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}

/// Wall-clock stand-in for a sink's playhead.
#[derive(Debug, Default)]
struct PlayheadClock {
    base: Duration,
    running_since: Option<Instant>,
    limit: Option<Duration>,
}

impl PlayheadClock {
    fn now(&self) -> Duration {
        let elapsed = self.running_since.map_or(Duration::ZERO, |since| since.elapsed());
        let raw = self.base.saturating_add(elapsed);
        self.limit.map_or(raw, |limit| raw.min(limit))
    }

    fn run(&mut self) {
        self.running_since.get_or_insert_with(Instant::now);
    }

    fn hold(&mut self) {
        self.base = self.now();
        self.running_since = None;
    }

    fn jump(&mut self, to: Duration) {
        let running = self.running_since.is_some();
        self.base = self.limit.map_or(to, |limit| to.min(limit));
        self.running_since = running.then(Instant::now);
    }

    fn finished(&self) -> bool {
        self.limit.is_some_and(|limit| self.now() >= limit)
    }
}

/// Clock-only engine for machines without a usable audio device.
pub struct NullEngine {
    state: PlayState,
    loaded: Option<PathBuf>,
    clock: PlayheadClock,
    end_reported: bool,
    events: EventSender,
}

impl NullEngine {
    pub fn new(events: EventSender) -> Self {
        Self {
            state: PlayState::Stopped,
            loaded: None,
            clock: PlayheadClock::default(),
            end_reported: false,
            events,
        }
    }

    /// Header-only probe; zero-length or undecodable files count as unknown.
    fn probe_duration(path: &Path) -> Option<Duration> {
        Decoder::try_from(File::open(path).ok()?)
            .ok()?
            .total_duration()
            .filter(|duration| !duration.is_zero())
    }
}

impl MediaEngine for NullEngine {
    fn load(&mut self, path: &Path) {
        self.clock = PlayheadClock {
            limit: Self::probe_duration(path),
            ..PlayheadClock::default()
        };
        self.loaded = Some(path.to_path_buf());
        self.state = PlayState::Paused;
        self.end_reported = false;
    }

    fn set_state(&mut self, state: PlayState) {
        if state == PlayState::Stopped {
            self.release();
            return;
        }
        if self.loaded.is_none() {
            return;
        }
        match state {
            PlayState::Playing => self.clock.run(),
            _ => self.clock.hold(),
        }
        self.state = state;
    }

    fn seek_absolute(&mut self, position: Duration) {
        if self.loaded.is_some() {
            self.clock.jump(position);
        }
    }

    fn query_position(&self) -> Option<Duration> {
        self.loaded.as_ref().map(|_| self.clock.now())
    }

    fn query_duration(&self) -> Option<Duration> {
        self.clock.limit
    }

    fn query_state(&self) -> Option<PlayState> {
        Some(self.state)
    }

    fn tick(&mut self) {
        if !self.end_reported && self.state == PlayState::Playing && self.clock.finished() {
            self.end_reported = true;
            self.events.engine(EngineEvent::EndOfStream);
        }
    }

    fn release(&mut self) {
        self.loaded = None;
        self.state = PlayState::Stopped;
        self.clock = PlayheadClock::default();
        self.end_reported = false;
    }

    fn output_name(&self) -> Option<String> {
        Some(String::from("Null audio engine"))
    }
}
