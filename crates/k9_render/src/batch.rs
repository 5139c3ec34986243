//! CPU-side sprite batching.
//!
//! Every draw request is transformed into four screen-space vertices and
//! appended to one mesh per frame. A draw call covers a contiguous index range
//! sharing one texture, so consecutive sprites from the same texture collapse
//! into a single `draw_indexed`.

use glam::Mat4;
use k9_core::Color;

use crate::quad::{QuadGeometry, QUAD_INDICES, VERTEX_COUNT};
use crate::vertex::SpriteVertex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub texture_id: u64,
    pub index_start: u32,
    pub index_count: u32,
}

#[derive(Debug, Default)]
pub struct SpriteBatch {
    pub vertices: Vec<SpriteVertex>,
    pub indices: Vec<u32>,
    pub draw_calls: Vec<DrawCall>,
}

impl SpriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.draw_calls.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.draw_calls.is_empty()
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / VERTEX_COUNT
    }

    pub fn push_quad(
        &mut self,
        texture_id: u64,
        geometry: &QuadGeometry,
        transform: Mat4,
        color: Color,
    ) {
        let color = color.to_linear();
        let base_index = self.vertices.len() as u32;
        for (pos, uv) in geometry.positions.iter().zip(geometry.tex_coords.iter()) {
            let p = transform.transform_point3(*pos);
            self.vertices.push(SpriteVertex {
                position: [p.x, p.y],
                tex_coords: [uv.x, uv.y],
                color,
            });
        }

        let index_start = self.indices.len() as u32;
        self.indices
            .extend(QUAD_INDICES.iter().map(|&i| base_index + i));
        self.push_draw_call(texture_id, index_start, QUAD_INDICES.len() as u32);
    }

    fn push_draw_call(&mut self, texture_id: u64, index_start: u32, index_count: u32) {
        if let Some(last) = self.draw_calls.last_mut() {
            let contiguous = last.index_start + last.index_count == index_start;
            if last.texture_id == texture_id && contiguous {
                last.index_count += index_count;
                return;
            }
        }
        self.draw_calls.push(DrawCall {
            texture_id,
            index_start,
            index_count,
        });
    }
}
