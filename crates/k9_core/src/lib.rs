pub mod config;
pub mod geometry;
pub mod time;

pub use config::{AppConfig, ConfigError, FONT_POINT_SIZES, MAX_VOLUME};
pub use geometry::{Color, Flip, Rect};
pub use time::FrameClock;
