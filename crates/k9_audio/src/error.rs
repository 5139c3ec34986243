use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device is available")]
    Unavailable,
    #[error("unknown music track '{0}'")]
    UnknownTrack(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid music manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("track id '{id}' appears more than once in {path}")]
    DuplicateTrack { id: String, path: PathBuf },
    #[error("failed to decode track '{id}': {source}")]
    Decode {
        id: String,
        source: rodio::decoder::DecoderError,
    },
    #[error("failed to create audio sink: {0}")]
    Sink(#[from] rodio::PlayError),
}
