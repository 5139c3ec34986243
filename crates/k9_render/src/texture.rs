use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::{Rgba, RgbaImage};

use crate::error::RenderError;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// A sampled 2D texture ready to be bound by the sprite pipeline.
pub struct Texture {
    pub id: u64,
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub bind_group: Arc<wgpu::BindGroup>,
}

impl Texture {
    /// Upload an RGBA8 image. `layout` is the sprite pipeline's texture layout.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        image: &RgbaImage,
        label: &str,
    ) -> Self {
        let (width, height) = image.dimensions();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        // Anisotropic clamping requires every filter to be linear.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sprite Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: 16,
            ..Default::default()
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        log::info!("Loaded texture '{}': {}x{}", label, width, height);

        Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            label: label.to_string(),
            width,
            height,
            texture,
            view,
            sampler,
            bind_group: Arc::new(bind_group),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Decode PNG or JPEG bytes into RGBA8, whatever the source channel layout.
pub fn decode_rgba(bytes: &[u8], label: &str) -> Result<RgbaImage, RenderError> {
    let image = image::load_from_memory(bytes).map_err(|source| RenderError::ImageDecode {
        label: label.to_string(),
        source,
    })?;
    Ok(image.to_rgba8())
}

pub fn load_rgba(path: &Path) -> Result<RgbaImage, RenderError> {
    let bytes = fs::read(path).map_err(|source| RenderError::TextureNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    decode_rgba(&bytes, &path.display().to_string())
}

/// Magenta/black checkerboard used when a texture file cannot be loaded.
pub fn checkerboard(size: u32, cell: u32) -> RgbaImage {
    let cell = cell.max(1);
    RgbaImage::from_fn(size, size, |x, y| {
        if ((x / cell) + (y / cell)) % 2 == 0 {
            Rgba([255, 0, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn encode_png(image: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("png encoding should succeed");
        bytes
    }

    #[test]
    fn decode_rgba_preserves_size_and_pixels() {
        let mut source = RgbaImage::new(3, 2);
        source.put_pixel(2, 1, Rgba([10, 20, 30, 40]));
        let decoded = decode_rgba(&encode_png(&source), "test").expect("png should decode");
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(2, 1), &Rgba([10, 20, 30, 40]));
    }

    #[test]
    fn decode_rgba_expands_rgb_to_opaque_rgba() {
        let rgb = image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]));
        let mut bytes = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("png encoding should succeed");
        let decoded = decode_rgba(&bytes, "rgb").expect("rgb png should decode");
        assert_eq!(decoded.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn decode_rgba_rejects_garbage() {
        let err = decode_rgba(b"definitely not an image", "garbage").expect_err("should fail");
        assert!(matches!(err, RenderError::ImageDecode { .. }));
        assert!(err.to_string().contains("garbage"));
    }

    #[test]
    fn load_rgba_reports_missing_file() {
        let path = PathBuf::from("assets/textures/__does_not_exist__.png");
        let err = load_rgba(&path).expect_err("missing file should fail");
        assert!(matches!(err, RenderError::TextureNotFound { .. }));
    }

    #[test]
    fn checkerboard_alternates_cells() {
        let image = checkerboard(8, 4);
        assert_eq!(image.dimensions(), (8, 8));
        assert_eq!(image.get_pixel(0, 0), &Rgba([255, 0, 255, 255]));
        assert_eq!(image.get_pixel(4, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(image.get_pixel(4, 4), &Rgba([255, 0, 255, 255]));
    }
}
