pub mod batch;
pub mod camera;
pub mod error;
pub mod font;
pub mod gpu_context;
pub mod quad;
pub mod renderer;
pub mod sprite_pipeline;
pub mod texture;
pub mod vertex;

pub use error::RenderError;
pub use font::{Font, FontError};
pub use quad::{Corner, QuadGeometry, RectParams};
pub use renderer::{FrameStats, OverlayTarget, Renderer2D, RendererConfig};
pub use texture::Texture;
