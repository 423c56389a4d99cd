use crate::audio::MediaEngine;
use crate::catalog::Catalog;
use crate::events::{ControlEvent, EngineEvent};
use crate::model::{AssetRef, PlayState, PlaybackSnapshot, Track};
use crate::poller;
use crate::shuffle::ShuffleSequencer;
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const MAX_PENDING_NOTICES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Audio,
    Cover,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => f.write_str("audio file"),
            Self::Cover => f.write_str("cover image"),
        }
    }
}

/// Non-fatal condition surfaced to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Notice {
    #[error("{kind} not found: {reference}")]
    ResourceNotFound { kind: AssetKind, reference: AssetRef },

    #[error("engine error: {0}")]
    EngineError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("track index {index} is out of range for a catalog of {len}")]
    InvalidIndex { index: usize, len: usize },
}

pub struct PlaybackController<E: MediaEngine> {
    catalog: Catalog,
    engine: E,
    sequencer: ShuffleSequencer,
    current_index: usize,
    play_state: PlayState,
    shuffle_enabled: bool,
    loop_enabled: bool,
    position_seconds: f64,
    duration_seconds: f64,
    loaded_index: Option<usize>,
    cover: Option<PathBuf>,
    notices: VecDeque<Notice>,
    pub status: String,
    pub dirty: bool,
}

impl<E: MediaEngine> PlaybackController<E> {
    pub fn new(catalog: Catalog, engine: E, mut sequencer: ShuffleSequencer) -> Self {
        if sequencer.len() != catalog.len() {
            sequencer.regenerate(catalog.len());
        }

        let mut controller = Self {
            catalog,
            engine,
            sequencer,
            current_index: 0,
            play_state: PlayState::Stopped,
            shuffle_enabled: false,
            loop_enabled: false,
            position_seconds: 0.0,
            duration_seconds: 0.0,
            loaded_index: None,
            cover: None,
            notices: VecDeque::new(),
            status: String::from("Ready"),
            dirty: true,
        };
        controller.reload_metadata();
        controller
    }

    pub fn play(&mut self) {
        if self.play_state == PlayState::Playing {
            return;
        }

        if self.play_state == PlayState::Paused && self.loaded_index == Some(self.current_index) {
            self.engine.set_state(PlayState::Playing);
            self.play_state = PlayState::Playing;
            info!(index = self.current_index, "resumed");
            self.set_status(format!("Playing: {}", self.current_track().title));
            return;
        }

        let audio = self.current_track().audio.clone();
        let Some(path) = self.catalog.locate(&audio) else {
            self.report(Notice::ResourceNotFound {
                kind: AssetKind::Audio,
                reference: audio,
            });
            return;
        };

        self.engine.load(&path);
        self.loaded_index = Some(self.current_index);
        self.engine.set_state(PlayState::Playing);
        self.play_state = PlayState::Playing;
        self.position_seconds = 0.0;
        self.duration_seconds = self
            .engine
            .query_duration()
            .map_or(0.0, |duration| duration.as_secs_f64());
        info!(index = self.current_index, path = %path.display(), "playing");
        self.set_status(format!("Playing: {}", self.current_track().title));
    }

    pub fn pause(&mut self) {
        if self.play_state != PlayState::Playing {
            return;
        }
        self.engine.set_state(PlayState::Paused);
        self.play_state = PlayState::Paused;
        info!(index = self.current_index, "paused");
        self.set_status(String::from("Paused"));
    }

    pub fn stop(&mut self) {
        self.engine.set_state(PlayState::Stopped);
        self.play_state = PlayState::Stopped;
        self.position_seconds = 0.0;
        self.loaded_index = None;
        debug!(index = self.current_index, "stopped");
        self.set_status(String::from("Stopped"));
    }

    pub fn toggle_play_pause(&mut self) {
        if self.play_state == PlayState::Playing {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn next(&mut self) {
        let was_playing = self.play_state == PlayState::Playing;
        let index = self.next_index();
        self.change_track(index, was_playing);
    }

    pub fn previous(&mut self) {
        let was_playing = self.play_state == PlayState::Playing;
        let index = self.previous_index();
        self.change_track(index, was_playing);
    }

    pub fn seek_relative(&mut self, delta_seconds: f64) {
        if !delta_seconds.is_finite() {
            return;
        }

        let target = self.position_seconds + delta_seconds;
        let target = if self.duration_seconds > 0.0 {
            target.clamp(0.0, self.duration_seconds)
        } else if delta_seconds > 0.0 {
            // No known end to clamp against.
            return;
        } else {
            target.max(0.0)
        };
        self.seek_to(target);
    }

    pub fn seek_to_fraction(&mut self, fraction: f64) {
        if self.duration_seconds <= 0.0 || !fraction.is_finite() {
            return;
        }
        self.seek_to(fraction.clamp(0.0, 1.0) * self.duration_seconds);
    }

    pub fn set_shuffle(&mut self, enabled: bool) {
        if enabled {
            self.sequencer.regenerate(self.catalog.len());
        }
        self.shuffle_enabled = enabled;
        self.set_status(format!("Shuffle {}", on_off(enabled)));
    }

    pub fn set_loop(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
        self.set_status(format!("Loop {}", on_off(enabled)));
    }

    pub fn select_track(&mut self, index: usize) -> Result<(), ControlError> {
        let len = self.catalog.len();
        if index >= len {
            warn!(index, len, "rejected track selection");
            return Err(ControlError::InvalidIndex { index, len });
        }

        let was_playing = self.play_state == PlayState::Playing;
        self.stop();
        self.current_index = index;
        self.reload_metadata();
        if was_playing {
            self.play();
        }
        Ok(())
    }

    pub fn on_engine_end_of_stream(&mut self) {
        info!(index = self.current_index, looping = self.loop_enabled, "end of stream");
        if self.loop_enabled {
            self.stop();
            self.play();
        } else {
            let index = self.next_index();
            self.change_track(index, true);
        }
    }

    /// Reports the failure; `play_state` is left as it was.
    pub fn on_engine_error(&mut self, description: &str) {
        self.report(Notice::EngineError(description.to_string()));
    }

    pub fn on_position_update(&mut self, position_seconds: f64, duration_seconds: f64) {
        self.position_seconds = sanitize_seconds(position_seconds);
        self.duration_seconds = sanitize_seconds(duration_seconds);
        self.dirty = true;
    }

    pub fn handle_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Engine(EngineEvent::EndOfStream) => self.on_engine_end_of_stream(),
            ControlEvent::Engine(EngineEvent::Error(description)) => {
                self.on_engine_error(&description)
            }
            ControlEvent::PositionTick(token) => {
                poller::sample(self);
                drop(token);
            }
        }
    }

    /// Lets the engine notice end-of-stream; call once per loop iteration.
    pub fn tick_engine(&mut self) {
        self.engine.tick();
    }

    pub fn shutdown(&mut self) {
        self.engine.release();
        self.play_state = PlayState::Stopped;
        self.loaded_index = None;
        info!("engine released");
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            current_index: self.current_index,
            play_state: self.play_state,
            shuffle_enabled: self.shuffle_enabled,
            loop_enabled: self.loop_enabled,
            position_seconds: self.position_seconds,
            duration_seconds: self.duration_seconds,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    pub fn shuffle_enabled(&self) -> bool {
        self.shuffle_enabled
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn position_seconds(&self) -> f64 {
        self.position_seconds
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn current_track(&self) -> &Track {
        // current_index is kept in bounds and the catalog is never empty.
        &self.catalog.tracks()[self.current_index]
    }

    pub fn cover_path(&self) -> Option<&Path> {
        self.cover.as_deref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn shuffle_remaining(&self) -> &[usize] {
        self.sequencer.remaining()
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    fn next_index(&mut self) -> usize {
        if self.shuffle_enabled {
            self.sequencer.next_after(self.current_index)
        } else {
            (self.current_index + 1) % self.catalog.len()
        }
    }

    fn previous_index(&mut self) -> usize {
        if self.shuffle_enabled {
            self.sequencer.random_other(self.current_index)
        } else {
            let len = self.catalog.len();
            (self.current_index + len - 1) % len
        }
    }

    fn change_track(&mut self, index: usize, resume: bool) {
        debug!(from = self.current_index, to = index, resume, "changing track");
        self.current_index = index;
        self.reload_metadata();
        if resume {
            self.stop();
            self.play();
        }
    }

    fn reload_metadata(&mut self) {
        let track = self.current_track();
        let cover_ref = track.cover.clone();
        let title = track.title.clone();
        self.set_status(format!("Selected: {title}"));
        self.cover = self.catalog.locate(&cover_ref);
        if self.cover.is_none() {
            self.report(Notice::ResourceNotFound {
                kind: AssetKind::Cover,
                reference: cover_ref,
            });
        }
    }

    fn seek_to(&mut self, target_seconds: f64) {
        let target = Duration::try_from_secs_f64(target_seconds).unwrap_or_default();
        self.engine.seek_absolute(target);
        debug!(target = target.as_secs_f64(), "seek");
        // Nothing is loaded while stopped; the playhead stays where stop() put it.
        if self.play_state != PlayState::Stopped {
            self.position_seconds = target.as_secs_f64();
            self.dirty = true;
        }
    }

    fn report(&mut self, notice: Notice) {
        warn!("{notice}");
        self.set_status(notice.to_string());
        if self.notices.len() == MAX_PENDING_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(notice);
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
        self.dirty = true;
    }
}

fn sanitize_seconds(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{self, TickToken};
    use crate::model::Track;
    use std::collections::HashSet;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use tempfile::{TempDir, tempdir};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(PathBuf),
        SetState(PlayState),
        Seek(Duration),
        Release,
    }

    #[derive(Default)]
    struct RecordingEngine {
        calls: Vec<Call>,
        state: Option<PlayState>,
        position: Option<Duration>,
        duration: Option<Duration>,
    }

    impl RecordingEngine {
        fn loads(&self) -> Vec<PathBuf> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    Call::Load(path) => Some(path.clone()),
                    _ => None,
                })
                .collect()
        }

        fn seeks(&self) -> Vec<Duration> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    Call::Seek(target) => Some(*target),
                    _ => None,
                })
                .collect()
        }
    }

    impl MediaEngine for RecordingEngine {
        fn load(&mut self, path: &Path) {
            self.calls.push(Call::Load(path.to_path_buf()));
            self.state = Some(PlayState::Paused);
        }

        fn set_state(&mut self, state: PlayState) {
            self.calls.push(Call::SetState(state));
            self.state = Some(state);
        }

        fn seek_absolute(&mut self, position: Duration) {
            self.calls.push(Call::Seek(position));
        }

        fn query_position(&self) -> Option<Duration> {
            self.position
        }

        fn query_duration(&self) -> Option<Duration> {
            self.duration
        }

        fn query_state(&self) -> Option<PlayState> {
            self.state
        }

        fn tick(&mut self) {}

        fn release(&mut self) {
            self.calls.push(Call::Release);
        }

        fn output_name(&self) -> Option<String> {
            Some(String::from("recording"))
        }
    }

    fn fixture(len: usize) -> (TempDir, Catalog) {
        let dir = tempdir().expect("tempdir");
        let tracks = (0..len)
            .map(|n| {
                fs::write(dir.path().join(format!("{n}.mp3")), b"audio").expect("audio");
                fs::write(dir.path().join(format!("{n}.png")), b"cover").expect("cover");
                Track::new(
                    &format!("song {n}"),
                    "creator",
                    "genre",
                    &format!("{n}.mp3"),
                    &format!("{n}.png"),
                )
            })
            .collect();
        let catalog = Catalog::new(tracks, dir.path()).expect("catalog");
        (dir, catalog)
    }

    fn controller(len: usize) -> (TempDir, PlaybackController<RecordingEngine>) {
        let (dir, catalog) = fixture(len);
        let controller = PlaybackController::new(
            catalog,
            RecordingEngine::default(),
            ShuffleSequencer::seeded(len, 17),
        );
        (dir, controller)
    }

    fn audio_path(dir: &TempDir, index: usize) -> PathBuf {
        dir.path().join(format!("{index}.mp3"))
    }

    #[test]
    fn play_loads_current_track_and_starts() {
        let (dir, mut controller) = controller(3);
        controller.play();

        assert_eq!(controller.play_state(), PlayState::Playing);
        assert_eq!(
            controller.engine().calls,
            vec![
                Call::Load(audio_path(&dir, 0)),
                Call::SetState(PlayState::Playing)
            ]
        );
    }

    #[test]
    fn play_while_playing_is_a_no_op() {
        let (_dir, mut controller) = controller(3);
        controller.play();
        let before = controller.engine().calls.len();

        controller.play();
        assert_eq!(controller.engine().calls.len(), before);
    }

    #[test]
    fn missing_audio_is_reported_and_playback_does_not_start() {
        let (dir, mut controller) = controller(2);
        fs::remove_file(audio_path(&dir, 0)).expect("remove");

        controller.play();

        assert_eq!(controller.play_state(), PlayState::Stopped);
        assert!(controller.engine().calls.is_empty());
        assert_eq!(
            controller.drain_notices(),
            vec![Notice::ResourceNotFound {
                kind: AssetKind::Audio,
                reference: AssetRef::from("0.mp3"),
            }]
        );
        assert!(controller.status.contains("not found"));
    }

    #[test]
    fn missing_cover_is_reported_on_track_change() {
        let (dir, mut controller) = controller(2);
        fs::remove_file(dir.path().join("1.png")).expect("remove");

        controller.next();

        assert_eq!(controller.cover_path(), None);
        assert_eq!(
            controller.drain_notices(),
            vec![Notice::ResourceNotFound {
                kind: AssetKind::Cover,
                reference: AssetRef::from("1.png"),
            }]
        );
    }

    #[test]
    fn pause_then_play_resumes_same_track_without_reloading() {
        let (_dir, mut controller) = controller(3);
        controller.play();
        controller.pause();
        assert_eq!(controller.play_state(), PlayState::Paused);

        controller.play();

        assert_eq!(controller.current_index(), 0);
        assert_eq!(controller.play_state(), PlayState::Playing);
        assert_eq!(controller.engine().loads().len(), 1);
        assert_eq!(
            controller.engine().calls.last(),
            Some(&Call::SetState(PlayState::Playing))
        );
    }

    #[test]
    fn pause_is_ignored_unless_playing() {
        let (_dir, mut controller) = controller(2);
        controller.pause();
        assert_eq!(controller.play_state(), PlayState::Stopped);
        assert!(controller.engine().calls.is_empty());
    }

    #[test]
    fn stop_resets_position() {
        let (_dir, mut controller) = controller(2);
        controller.play();
        controller.on_position_update(42.0, 120.0);

        controller.stop();

        assert_eq!(controller.play_state(), PlayState::Stopped);
        assert_eq!(controller.position_seconds(), 0.0);
        assert_eq!(
            controller.engine().calls.last(),
            Some(&Call::SetState(PlayState::Stopped))
        );
    }

    #[test]
    fn toggle_alternates_between_playing_and_paused() {
        let (_dir, mut controller) = controller(2);
        controller.toggle_play_pause();
        assert_eq!(controller.play_state(), PlayState::Playing);
        controller.toggle_play_pause();
        assert_eq!(controller.play_state(), PlayState::Paused);
        controller.toggle_play_pause();
        assert_eq!(controller.play_state(), PlayState::Playing);
    }

    #[test]
    fn next_while_stopped_does_not_start_playback() {
        let (_dir, mut controller) = controller(3);
        controller.next();

        assert_eq!(controller.current_index(), 1);
        assert_eq!(controller.play_state(), PlayState::Stopped);
        assert!(controller.engine().loads().is_empty());
    }

    #[test]
    fn next_while_playing_restarts_on_the_new_track() {
        let (dir, mut controller) = controller(3);
        controller.play();

        controller.next();

        assert_eq!(controller.current_index(), 1);
        assert_eq!(controller.play_state(), PlayState::Playing);
        assert_eq!(
            controller.engine().calls[2..],
            [
                Call::SetState(PlayState::Stopped),
                Call::Load(audio_path(&dir, 1)),
                Call::SetState(PlayState::Playing),
            ]
        );
    }

    #[test]
    fn next_while_paused_stays_paused_and_play_loads_new_track() {
        let (dir, mut controller) = controller(3);
        controller.play();
        controller.pause();

        controller.next();
        assert_eq!(controller.play_state(), PlayState::Paused);

        controller.play();
        assert_eq!(
            controller.engine().loads(),
            vec![audio_path(&dir, 0), audio_path(&dir, 1)]
        );
    }

    #[test]
    fn sequential_previous_wraps_to_the_end() {
        let (_dir, mut controller) = controller(4);
        controller.previous();
        assert_eq!(controller.current_index(), 3);
        controller.previous();
        assert_eq!(controller.current_index(), 2);
    }

    #[test]
    fn shuffle_next_visits_every_other_index_once() {
        let (_dir, mut controller) = controller(8);
        controller.set_shuffle(true);

        let mut seen = HashSet::new();
        for _ in 0..7 {
            controller.next();
            assert_ne!(controller.current_index(), 0);
            assert!(seen.insert(controller.current_index()));
        }
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn shuffle_previous_leaves_the_sequence_alone() {
        let (_dir, mut controller) = controller(6);
        controller.set_shuffle(true);
        let before = controller.shuffle_remaining().to_vec();

        for _ in 0..10 {
            let current = controller.current_index();
            controller.previous();
            assert_ne!(controller.current_index(), current);
        }
        assert_eq!(controller.shuffle_remaining(), before.as_slice());
    }

    #[test]
    fn seek_relative_clamps_to_zero() {
        let (_dir, mut controller) = controller(2);
        controller.play();
        controller.on_position_update(5.0, 120.0);

        controller.seek_relative(-1000.0);

        assert_eq!(controller.position_seconds(), 0.0);
        assert_eq!(controller.engine().seeks(), vec![Duration::ZERO]);
    }

    #[test]
    fn seek_relative_clamps_to_duration() {
        let (_dir, mut controller) = controller(2);
        controller.on_position_update(115.0, 120.0);

        controller.seek_relative(10.0);

        assert_eq!(controller.engine().seeks(), vec![Duration::from_secs(120)]);
    }

    #[test]
    fn forward_seek_without_duration_is_ignored() {
        let (_dir, mut controller) = controller(2);
        controller.on_position_update(5.0, 0.0);

        controller.seek_relative(10.0);
        assert!(controller.engine().seeks().is_empty());

        controller.seek_relative(-10.0);
        assert_eq!(controller.engine().seeks(), vec![Duration::ZERO]);
    }

    #[test]
    fn seek_to_fraction_requests_absolute_target() {
        let (_dir, mut controller) = controller(2);
        controller.play();
        controller.on_position_update(0.0, 200.0);

        controller.seek_to_fraction(0.5);

        assert_eq!(controller.engine().seeks(), vec![Duration::from_secs(100)]);
        assert_eq!(controller.position_seconds(), 100.0);
    }

    #[test]
    fn seek_while_stopped_keeps_cached_position() {
        let (_dir, mut controller) = controller(2);
        controller.on_position_update(0.0, 200.0);

        controller.seek_to_fraction(0.5);
        controller.seek_relative(-30.0);

        assert_eq!(controller.play_state(), PlayState::Stopped);
        assert_eq!(controller.position_seconds(), 0.0);
    }

    #[test]
    fn seek_to_fraction_without_duration_is_ignored() {
        let (_dir, mut controller) = controller(2);
        controller.seek_to_fraction(0.5);
        assert!(controller.engine().seeks().is_empty());
    }

    #[test]
    fn invalid_index_is_rejected_before_mutation() {
        let (_dir, mut controller) = controller(3);
        controller.play();
        let calls_before = controller.engine().calls.len();

        let err = controller.select_track(3).expect_err("out of range");

        assert_eq!(err, ControlError::InvalidIndex { index: 3, len: 3 });
        assert_eq!(controller.current_index(), 0);
        assert_eq!(controller.play_state(), PlayState::Playing);
        assert_eq!(controller.engine().calls.len(), calls_before);
    }

    #[test]
    fn select_track_while_stopped_stays_stopped() {
        let (_dir, mut controller) = controller(4);
        controller.select_track(2).expect("select");

        assert_eq!(controller.current_index(), 2);
        assert_eq!(controller.play_state(), PlayState::Stopped);
        assert!(controller.engine().loads().is_empty());
    }

    #[test]
    fn select_track_while_playing_resumes_on_new_track() {
        let (dir, mut controller) = controller(4);
        controller.play();

        controller.select_track(3).expect("select");

        assert_eq!(controller.play_state(), PlayState::Playing);
        assert_eq!(controller.engine().loads().last(), Some(&audio_path(&dir, 3)));
    }

    #[test]
    fn select_track_while_paused_ends_stopped() {
        let (_dir, mut controller) = controller(4);
        controller.play();
        controller.pause();

        controller.select_track(1).expect("select");
        assert_eq!(controller.play_state(), PlayState::Stopped);
    }

    #[test]
    fn end_of_stream_with_loop_restarts_same_track() {
        let (dir, mut controller) = controller(3);
        controller.select_track(1).expect("select");
        controller.set_loop(true);
        controller.play();

        controller.on_engine_end_of_stream();

        assert_eq!(controller.current_index(), 1);
        assert_eq!(controller.play_state(), PlayState::Playing);
        assert_eq!(
            controller.engine().loads(),
            vec![audio_path(&dir, 1), audio_path(&dir, 1)]
        );
    }

    #[test]
    fn end_of_stream_without_loop_advances_and_plays_from_any_state() {
        let (dir, mut controller) = controller(3);
        controller.play();
        controller.pause();

        controller.on_engine_end_of_stream();

        assert_eq!(controller.current_index(), 1);
        assert_eq!(controller.play_state(), PlayState::Playing);
        assert_eq!(controller.engine().loads().last(), Some(&audio_path(&dir, 1)));
    }

    #[test]
    fn engine_error_is_reported_without_touching_state() {
        let (_dir, mut controller) = controller(2);
        controller.play();

        controller.handle_event(ControlEvent::Engine(EngineEvent::Error(String::from(
            "decoder exploded",
        ))));

        assert_eq!(controller.play_state(), PlayState::Playing);
        assert_eq!(
            controller.drain_notices(),
            vec![Notice::EngineError(String::from("decoder exploded"))]
        );
    }

    #[test]
    fn position_tick_samples_playing_engine() {
        let (_dir, mut controller) = controller(2);
        controller.play();
        let flag = Arc::new(AtomicBool::new(false));
        let token = TickToken::acquire(&flag).expect("token");

        let engine = &mut controller.engine;
        engine.position = Some(Duration::from_secs(30));
        engine.duration = Some(Duration::from_secs(90));
        controller.handle_event(ControlEvent::PositionTick(token));

        assert_eq!(controller.position_seconds(), 30.0);
        assert_eq!(controller.duration_seconds(), 90.0);
        assert!(TickToken::acquire(&flag).is_some(), "tick should be released");
    }

    #[test]
    fn end_of_stream_event_is_dispatched() {
        let (_dir, mut controller) = controller(2);
        let (sender, rx) = events::channel();
        sender.engine(EngineEvent::EndOfStream);

        for event in rx.try_iter() {
            controller.handle_event(event);
        }

        assert_eq!(controller.current_index(), 1);
        assert_eq!(controller.play_state(), PlayState::Playing);
    }

    #[test]
    fn position_update_rejects_nonsense_values() {
        let (_dir, mut controller) = controller(2);
        controller.on_position_update(f64::NAN, -4.0);
        assert_eq!(controller.position_seconds(), 0.0);
        assert_eq!(controller.duration_seconds(), 0.0);
    }

    #[test]
    fn shutdown_releases_engine() {
        let (_dir, mut controller) = controller(2);
        controller.play();
        controller.shutdown();

        assert_eq!(controller.engine().calls.last(), Some(&Call::Release));
        assert_eq!(controller.play_state(), PlayState::Stopped);
    }

    proptest::proptest! {
        #[test]
        fn current_index_stays_in_bounds(len in 1usize..12, ops in proptest::collection::vec(0u8..12, 1..200)) {
            let (_dir, mut controller) = controller(len);
            for op in ops {
                match op {
                    0 => controller.play(),
                    1 => controller.pause(),
                    2 => controller.stop(),
                    3 => controller.next(),
                    4 => controller.previous(),
                    5 => controller.set_shuffle(!controller.shuffle_enabled()),
                    6 => controller.set_loop(!controller.loop_enabled()),
                    7 => controller.on_engine_end_of_stream(),
                    8 => controller.seek_relative(-10.0),
                    9 => controller.seek_to_fraction(0.3),
                    10 => {
                        let _ = controller.select_track(usize::from(op) % (len + 1));
                    }
                    _ => controller.toggle_play_pause(),
                }
                proptest::prop_assert!(controller.current_index() < len);
                proptest::prop_assert!(controller.position_seconds() >= 0.0);
            }
        }
    }
}
