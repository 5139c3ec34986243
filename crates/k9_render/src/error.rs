use std::path::PathBuf;

use thiserror::Error;

use crate::font::FontError;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("window surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("shader file not found: {path}: {source}")]
    ShaderNotFound {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("shader compilation failed for '{label}':\n{message}")]
    ShaderCompile { label: String, message: String },
    #[error("failed to load texture {path}: {source}")]
    TextureNotFound {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode image '{label}': {source}")]
    ImageDecode {
        label: String,
        source: image::ImageError,
    },
    #[error(transparent)]
    Font(#[from] FontError),
}
