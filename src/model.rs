use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque locator for an audio or cover asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(PathBuf);

impl AssetRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl From<&str> for AssetRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub creator: String,
    pub genre: String,
    pub audio: AssetRef,
    pub cover: AssetRef,
}

impl Track {
    pub fn new(title: &str, creator: &str, genre: &str, audio: &str, cover: &str) -> Self {
        Self {
            title: title.to_string(),
            creator: creator.to_string(),
            genre: genre.to_string(),
            audio: AssetRef::from(audio),
            cover: AssetRef::from(cover),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSnapshot {
    pub current_index: usize,
    pub play_state: PlayState,
    pub shuffle_enabled: bool,
    pub loop_enabled: bool,
    pub position_seconds: f64,
    pub duration_seconds: f64,
}

impl PlaybackSnapshot {
    /// Fraction of the track already played, `None` while the duration is unknown.
    pub fn progress_ratio(&self) -> Option<f64> {
        (self.duration_seconds > 0.0)
            .then(|| (self.position_seconds / self.duration_seconds).clamp(0.0, 1.0))
    }

    pub fn is_playing(&self) -> bool {
        self.play_state == PlayState::Playing
    }
}

pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
