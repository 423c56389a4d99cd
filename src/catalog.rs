use crate::model::{AssetRef, Track};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog has no tracks")]
    Empty,

    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Fixed, ordered playlist. Never empty, never mutated after construction.
#[derive(Debug, Clone)]
pub struct Catalog {
    tracks: Vec<Track>,
    asset_dir: PathBuf,
}

impl Catalog {
    pub fn new(tracks: Vec<Track>, asset_dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        if tracks.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self {
            tracks,
            asset_dir: asset_dir.into(),
        })
    }

    pub fn builtin(asset_dir: impl Into<PathBuf>) -> Self {
        Self {
            tracks: builtin_tracks(),
            asset_dir: asset_dir.into(),
        }
    }

    pub fn from_json_file(path: &Path, asset_dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let tracks: Vec<Track> =
            serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(tracks, asset_dir)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn asset_dir(&self) -> &Path {
        &self.asset_dir
    }

    /// Resolves an asset against the asset directory; `None` if nothing exists there.
    pub fn locate(&self, asset: &AssetRef) -> Option<PathBuf> {
        let path = asset.as_path();
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.asset_dir.join(path)
        };
        resolved.is_file().then_some(resolved)
    }
}

fn builtin_tracks() -> Vec<Track> {
    vec![
        Track::new(
            "Tell Your World",
            "livetune",
            "Electropop",
            "tellyourworld.mp3",
            "tellyourworld.png",
        ),
        Track::new(
            "The Disappearance of Hatsune Miku",
            "cosMo@Bousou-P",
            "Speedcore / Vocaloid Rock",
            "thedisappearanceofhatsunemiku.mp3",
            "thedisappearanceofhatsunemiku.png",
        ),
        Track::new(
            "World is Mine",
            "ryo (supercell)",
            "Pop Rock",
            "worldismine.mp3",
            "worldismine.png",
        ),
        Track::new(
            "Senbonzakura",
            "Kurousa-P (WhiteFlame)",
            "Neo-Japanese Rock",
            "senbonzakura.mp3",
            "senbonzakura.png",
        ),
        Track::new(
            "Rolling Girl",
            "wowaka",
            "Alt Rock",
            "rollinggirl.mp3",
            "rollinggirl.png",
        ),
        Track::new(
            "ODDS&ENDS",
            "ryo (supercell)",
            "Ballad / Electronic Rock",
            "oddsends.mp3",
            "oddsends.png",
        ),
        Track::new(
            "Ghost Rule",
            "DECO*27",
            "Hard Pop / Electro Rock",
            "ghostrule.mp3",
            "ghostrule.png",
        ),
        Track::new(
            "Two-Faced Lovers",
            "wowaka",
            "Alt Rock / High BPM",
            "twofacedlovers.mp3",
            "twofacedlovers.png",
        ),
        Track::new(
            "Unhappy Refrain",
            "wowaka",
            "Experimental Rock",
            "unhappyrefrain.mp3",
            "unhappyrefrain.png",
        ),
        Track::new(
            "Sand Planet",
            "Hachi (Kenshi Yonezu)",
            "Indie Rock / Synthpop",
            "sandplanet.mp3",
            "sandplanet.png",
        ),
        Track::new(
            "Streaming Heart",
            "DECO*27",
            "Electropop / Rock",
            "streamingheart.mp3",
            "streamingheart.png",
        ),
        Track::new(
            "AI Kotoba II",
            "DECO*27",
            "Ballad / Synthpop",
            "aikotobaii.mp3",
            "aikotobaii.png",
        ),
        Track::new(
            "Love Me, Love Me, Love Me",
            "DECO*27",
            "Dark Pop / Electro",
            "lovemelovemeloveme.mp3",
            "lovemelovemeloveme.png",
        ),
        Track::new(
            "Night Sky Patrol of Tomorrow",
            "DECO*27",
            "Pop Rock / Dreamy",
            "nightskypatroloftomorrow.mp3",
            "nightskypatroloftomorrow.png",
        ),
    ]
}
