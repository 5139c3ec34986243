pub mod error;
pub mod fade;
pub mod manifest;
pub mod music;

pub use error::AudioError;
pub use fade::{Fade, FadeDirection};
pub use manifest::{MusicLibrary, Track};
pub use music::{MusicPlayer, PlayCount};
