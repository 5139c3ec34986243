//! Music catalog.
//!
//! The manifest is a JSON file listing tracks by id:
//!
//! ```json
//! { "tracks": [ { "id": "title", "path": "title.ogg" } ] }
//! ```
//!
//! Relative paths are resolved against the manifest's own directory. Every
//! track is read into memory up front so playback never touches the disk.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::AudioError;

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    tracks: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    id: String,
    path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Track {
    pub id: String,
    pub path: PathBuf,
    pub bytes: Arc<[u8]>,
}

#[derive(Debug, Clone, Default)]
pub struct MusicLibrary {
    tracks: Vec<Track>,
}

impl MusicLibrary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, AudioError> {
        let json = fs::read_to_string(path).map_err(|source| AudioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: ManifestFile =
            serde_json::from_str(&json).map_err(|source| AudioError::Manifest {
                path: path.to_path_buf(),
                source,
            })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let mut seen = HashSet::new();
        let mut tracks = Vec::with_capacity(manifest.tracks.len());
        for entry in manifest.tracks {
            if !seen.insert(entry.id.clone()) {
                return Err(AudioError::DuplicateTrack {
                    id: entry.id,
                    path: path.to_path_buf(),
                });
            }
            let track_path = if entry.path.is_absolute() {
                entry.path
            } else {
                base_dir.join(entry.path)
            };
            let bytes = fs::read(&track_path).map_err(|source| AudioError::Read {
                path: track_path.clone(),
                source,
            })?;
            log::info!("Loaded music '{}' from {}", entry.id, track_path.display());
            tracks.push(Track {
                id: entry.id,
                path: track_path,
                bytes: Arc::from(bytes),
            });
        }

        Ok(Self { tracks })
    }

    /// Build a library from tracks already in memory.
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Track ids in manifest order.
    pub fn ids(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "k9_music_test_{}_{}_{}",
            name_hint,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&dir).expect("temp dir should be created");
        dir
    }

    #[test]
    fn load_resolves_tracks_next_to_manifest() {
        let dir = temp_dir_path("resolve");
        fs::write(dir.join("a.ogg"), b"first").expect("track a should write");
        fs::write(dir.join("b.ogg"), b"second").expect("track b should write");
        let manifest = dir.join("music.json");
        fs::write(
            &manifest,
            r#"{ "tracks": [
                { "id": "title", "path": "a.ogg" },
                { "id": "battle", "path": "b.ogg" }
            ] }"#,
        )
        .expect("manifest should write");

        let library = MusicLibrary::load(&manifest).expect("manifest should load");
        assert_eq!(library.ids(), vec!["title".to_string(), "battle".to_string()]);
        let battle = library.get("battle").expect("battle track");
        assert_eq!(&battle.bytes[..], b"second");
        assert_eq!(battle.path, dir.join("b.ogg"));
        assert!(!library.contains("credits"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let dir = temp_dir_path("duplicate");
        fs::write(dir.join("a.ogg"), b"x").expect("track should write");
        let manifest = dir.join("music.json");
        fs::write(
            &manifest,
            r#"{ "tracks": [
                { "id": "title", "path": "a.ogg" },
                { "id": "title", "path": "a.ogg" }
            ] }"#,
        )
        .expect("manifest should write");

        let err = MusicLibrary::load(&manifest).expect_err("duplicate should fail");
        assert!(matches!(err, AudioError::DuplicateTrack { ref id, .. } if id == "title"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_track_fails_the_whole_load() {
        let dir = temp_dir_path("missing");
        let manifest = dir.join("music.json");
        fs::write(&manifest, r#"{ "tracks": [ { "id": "gone", "path": "gone.ogg" } ] }"#)
            .expect("manifest should write");

        let err = MusicLibrary::load(&manifest).expect_err("missing track should fail");
        match err {
            AudioError::Read { path, .. } => assert_eq!(path, dir.join("gone.ogg")),
            other => panic!("unexpected error: {other}"),
        }

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn malformed_manifest_reports_parse_error() {
        let dir = temp_dir_path("malformed");
        let manifest = dir.join("music.json");
        fs::write(&manifest, "id,path\ntitle,a.ogg\n").expect("manifest should write");

        let err = MusicLibrary::load(&manifest).expect_err("csv is not json");
        assert!(matches!(err, AudioError::Manifest { .. }));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_manifest_loads_no_tracks() {
        let dir = temp_dir_path("empty");
        let manifest = dir.join("music.json");
        fs::write(&manifest, "{}").expect("manifest should write");

        let library = MusicLibrary::load(&manifest).expect("empty manifest should load");
        assert!(library.is_empty());

        let _ = fs::remove_dir_all(&dir);
    }
}
