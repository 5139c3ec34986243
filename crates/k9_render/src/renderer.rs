//! Renderer2D: owns the GPU context and draws textured quads in window pixels.
//!
//! A frame is `begin_frame()`, any number of `draw_*` calls, then `end_frame()`.
//! `begin_frame()` acquires the surface texture first and reports whether the
//! frame can be drawn at all. Draw calls only record into the CPU batch;
//! `end_frame()` uploads the mesh, clears to the background color, issues the
//! batched draws and hands the same encoder to an overlay callback (the debug
//! panel) before presenting.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use k9_core::{Color, Flip, Rect};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::batch::SpriteBatch;
use crate::camera::Camera2D;
use crate::error::RenderError;
use crate::font::Font;
use crate::gpu_context::GpuContext;
use crate::quad::{source_uv, sprite_transform, QuadGeometry, INDEX_COUNT, VERTEX_COUNT};
use crate::sprite_pipeline::SpritePipeline;
use crate::texture::{load_rgba, Texture};
use crate::vertex::SpriteVertex;

#[derive(Debug, Clone, Default)]
pub struct RendererConfig {
    pub vsync: bool,
    /// WGSL file replacing the built-in sprite shader.
    pub shader_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub draw_calls: u32,
    pub quads: u32,
}

/// Everything an overlay needs to record its own render pass.
pub struct OverlayTarget<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub view: &'a wgpu::TextureView,
    pub size_in_pixels: [u32; 2],
}

pub struct Renderer2D {
    gpu: GpuContext,
    pipeline: SpritePipeline,
    /// Requested screen rect. The camera projects only its visible part.
    screen: Rect,
    visible: Option<Rect>,
    camera: Camera2D,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,

    // The mesh is rebuilt on the CPU every frame and streamed into these
    // buffers. They grow to the next power of two and never shrink.
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    index_capacity: usize,

    batch: SpriteBatch,
    frame_textures: HashMap<u64, Arc<wgpu::BindGroup>>,
    background: [f32; 4],
    stats: FrameStats,
    frame: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
}

impl Renderer2D {
    pub fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self, RenderError> {
        let gpu = GpuContext::new(window, config.vsync)?;
        let pipeline =
            SpritePipeline::load(&gpu.device, gpu.surface_format, config.shader_path.as_deref())?;

        let camera = Camera2D::new(gpu.size.0, gpu.size.1);
        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera.build_uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group = pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);

        let vertex_buffer = create_vertex_buffer(&gpu.device, VERTEX_COUNT);
        let index_buffer = create_index_buffer(&gpu.device, INDEX_COUNT);

        let mut renderer = Self {
            gpu,
            pipeline,
            screen: camera.screen,
            visible: Some(camera.screen),
            camera,
            camera_buffer,
            camera_bind_group,
            vertex_buffer,
            index_buffer,
            vertex_capacity: VERTEX_COUNT,
            index_capacity: INDEX_COUNT,
            batch: SpriteBatch::new(),
            frame_textures: HashMap::new(),
            background: [0.0, 0.0, 0.0, 1.0],
            stats: FrameStats::default(),
            frame: None,
        };
        let (w, h) = renderer.gpu.size;
        renderer.set_screen_size(Rect::new(0, 0, w as i32, h as i32));
        Ok(renderer)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.gpu.device
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.gpu.surface_format
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.gpu.size
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.frame = None;
        self.gpu.resize(width, height);
        self.set_screen_size(Rect::new(0, 0, width as i32, height as i32));
    }

    /// Set the area sprites are drawn into, in window pixels. The part that
    /// overlaps the surface becomes both the viewport and the projection, so
    /// one world unit stays one pixel and the rest is clipped.
    pub fn set_screen_size(&mut self, screen: Rect) {
        self.screen = screen;
        self.visible = visible_rect(screen, self.gpu.size);
        match self.visible {
            Some(visible) => {
                self.camera.screen = visible;
                self.gpu.queue.write_buffer(
                    &self.camera_buffer,
                    0,
                    bytemuck::cast_slice(&[self.camera.build_uniform()]),
                );
            }
            None => log::debug!("Screen rect {:?} is outside the surface", screen),
        }
    }

    pub fn screen_size(&self) -> Rect {
        self.screen
    }

    pub fn set_background_color(&mut self, rgba: [f32; 4]) {
        self.background = rgba;
    }

    pub fn background_color(&self) -> [f32; 4] {
        self.background
    }

    /// Statistics of the last presented frame.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Acquire the next surface texture and clear the batch. Returns `false`
    /// when the surface is unavailable; the caller should skip the frame,
    /// including any overlay preparation, and try again next redraw.
    pub fn begin_frame(&mut self) -> bool {
        self.batch.clear();
        self.frame_textures.clear();
        self.frame = self.gpu.begin_frame();
        self.frame.is_some()
    }

    pub fn draw_texture(&mut self, texture: &Texture, dest: Rect, color: Color, flip: Flip) {
        self.draw_geometry(texture, &QuadGeometry::default(), dest, color, flip);
    }

    /// Draw the `src` texel rect of `texture` stretched over `dest`.
    pub fn draw_texture_region(
        &mut self,
        texture: &Texture,
        src: Rect,
        dest: Rect,
        color: Color,
        flip: Flip,
    ) {
        let params = source_uv(src, texture.width, texture.height);
        if !params.uvs_valid() {
            log::warn!(
                "Source rect {:?} lies outside texture '{}' ({}x{}), skipping draw",
                src,
                texture.label,
                texture.width,
                texture.height
            );
            return;
        }
        self.draw_geometry(texture, &params.to_geometry(), dest, color, flip);
    }

    pub fn draw_geometry(
        &mut self,
        texture: &Texture,
        geometry: &QuadGeometry,
        dest: Rect,
        color: Color,
        flip: Flip,
    ) {
        if dest.is_empty() {
            return;
        }
        self.batch
            .push_quad(texture.id, geometry, sprite_transform(dest, flip), color);
        self.frame_textures
            .entry(texture.id)
            .or_insert_with(|| texture.bind_group.clone());
    }

    /// Submit the recorded frame. `overlay` records into the same encoder
    /// after the sprites, targeting the same surface view. Without a frame
    /// acquired by [`Self::begin_frame`] this does nothing.
    pub fn end_frame<F>(&mut self, overlay: F)
    where
        F: FnOnce(OverlayTarget<'_>),
    {
        let Some((output, view)) = self.frame.take() else {
            log::debug!("end_frame without an acquired surface texture");
            return;
        };

        if !self.batch.is_empty() {
            self.ensure_mesh_capacity(self.batch.vertices.len(), self.batch.indices.len());
            self.gpu.queue.write_buffer(
                &self.vertex_buffer,
                0,
                bytemuck::cast_slice(&self.batch.vertices),
            );
            self.gpu
                .queue
                .write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&self.batch.indices));
        }

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let mut draw_calls = 0u32;
        {
            let clear = Color::from_normalized(self.background).to_linear();
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sprite Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear[0] as f64,
                            g: clear[1] as f64,
                            b: clear[2] as f64,
                            a: clear[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            if let (false, Some(visible)) = (self.batch.is_empty(), self.visible) {
                let [x, y, w, h] = viewport(visible);
                render_pass.set_viewport(x, y, w, h, 0.0, 1.0);
                render_pass.set_pipeline(&self.pipeline.render_pipeline);
                render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

                let mut bound: Option<u64> = None;
                for draw in &self.batch.draw_calls {
                    let Some(bind_group) = self.frame_textures.get(&draw.texture_id) else {
                        continue;
                    };
                    if bound != Some(draw.texture_id) {
                        render_pass.set_bind_group(1, bind_group.as_ref(), &[]);
                        bound = Some(draw.texture_id);
                    }
                    render_pass.draw_indexed(
                        draw.index_start..(draw.index_start + draw.index_count),
                        0,
                        0..1,
                    );
                    draw_calls += 1;
                }
            }
        }

        overlay(OverlayTarget {
            device: &self.gpu.device,
            queue: &self.gpu.queue,
            encoder: &mut encoder,
            view: &view,
            size_in_pixels: [self.gpu.size.0, self.gpu.size.1],
        });

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.stats = FrameStats {
            draw_calls,
            quads: self.batch.quad_count() as u32,
        };
    }

    pub fn load_texture(&self, path: &Path) -> Result<Texture, RenderError> {
        let image = load_rgba(path)?;
        Ok(self.texture_from_image(&image, &path.display().to_string()))
    }

    pub fn texture_from_image(&self, image: &RgbaImage, label: &str) -> Texture {
        Texture::from_image(
            &self.gpu.device,
            &self.gpu.queue,
            &self.pipeline.texture_layout,
            image,
            label,
        )
    }

    /// Rasterise `text` with `font` and upload the result as a texture.
    pub fn render_text(
        &self,
        font: &Font,
        text: &str,
        color: Color,
        point_size: u32,
    ) -> Result<Texture, RenderError> {
        let bitmap = font.render_text(text, color, point_size)?;
        let label = format!("text '{}' ({}pt, {})", text, point_size, font.name());
        Ok(self.texture_from_image(&bitmap, &label))
    }

    fn ensure_mesh_capacity(&mut self, vertex_count: usize, index_count: usize) {
        if vertex_count > self.vertex_capacity {
            self.vertex_capacity = vertex_count.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.vertex_capacity);
            log::debug!("Grew sprite vertex buffer to {}", self.vertex_capacity);
        }
        if index_count > self.index_capacity {
            self.index_capacity = index_count.next_power_of_two();
            self.index_buffer = create_index_buffer(&self.gpu.device, self.index_capacity);
            log::debug!("Grew sprite index buffer to {}", self.index_capacity);
        }
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<SpriteVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Intersect the screen rect with the surface; `None` when nothing is left.
fn visible_rect(screen: Rect, surface: (u32, u32)) -> Option<Rect> {
    let left = screen.x.max(0);
    let top = screen.y.max(0);
    let right = screen.right().min(surface.0 as i32);
    let bottom = screen.bottom().min(surface.1 as i32);
    if right <= left || bottom <= top {
        return None;
    }
    Some(Rect::new(left, top, right - left, bottom - top))
}

fn viewport(rect: Rect) -> [f32; 4] {
    [rect.x as f32, rect.y as f32, rect.w as f32, rect.h as f32]
}
