//! Quad geometry and the affine math that places a textured quad on screen.
//!
//! A sprite is a unit quad centered on the origin. [`sprite_transform`] scales
//! and moves it onto a destination rect in window pixels, and
//! [`screen_projection`] maps window pixels to clip space. UV `(0, 0)` is the
//! top-left texel of the image.

use glam::{Mat4, Vec2, Vec3, Vec4};
use k9_core::{Flip, Rect};

pub const VERTEX_COUNT: usize = 4;
pub const INDEX_COUNT: usize = 6;

/// Two triangles over the corners in [`Corner`] order.
pub const QUAD_INDICES: [u32; INDEX_COUNT] = [0, 1, 2, 0, 2, 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft = 0,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    pub const ALL: [Corner; VERTEX_COUNT] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];
}

/// Quad described point by point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadGeometry {
    pub positions: [Vec3; VERTEX_COUNT],
    pub tex_coords: [Vec2; VERTEX_COUNT],
}

impl Default for QuadGeometry {
    fn default() -> Self {
        Self {
            positions: [
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ],
            tex_coords: [
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
        }
    }
}

impl QuadGeometry {
    pub fn position(&self, corner: Corner) -> Vec3 {
        self.positions[corner as usize]
    }

    pub fn set_position(&mut self, corner: Corner, pos: Vec3) {
        self.positions[corner as usize] = pos;
    }

    pub fn tex_coord(&self, corner: Corner) -> Vec2 {
        self.tex_coords[corner as usize]
    }

    pub fn set_tex_coord(&mut self, corner: Corner, uv: Vec2) {
        self.tex_coords[corner as usize] = uv;
    }
}

/// Quad described by a rectangle and a UV window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectParams {
    /// x: top-left x, y: top-left y, z: bottom-right x, w: bottom-right y.
    pub bounds: Vec4,
    pub min_uv: Vec2,
    pub max_uv: Vec2,
}

impl Default for RectParams {
    fn default() -> Self {
        Self {
            bounds: Vec4::new(-0.5, -0.5, 0.5, 0.5),
            min_uv: Vec2::ZERO,
            max_uv: Vec2::ONE,
        }
    }
}

impl RectParams {
    /// True when both UV corners lie inside `[0, 1]` on each axis.
    pub fn uvs_valid(&self) -> bool {
        let unit = 0.0..=1.0;
        [self.min_uv, self.max_uv]
            .iter()
            .all(|uv| unit.contains(&uv.x) && unit.contains(&uv.y))
    }

    pub fn to_geometry(&self) -> QuadGeometry {
        let b = self.bounds;
        let (min, max) = (self.min_uv, self.max_uv);
        QuadGeometry {
            positions: [
                Vec3::new(b.x, b.y, 0.0),
                Vec3::new(b.z, b.y, 0.0),
                Vec3::new(b.z, b.w, 0.0),
                Vec3::new(b.x, b.w, 0.0),
            ],
            tex_coords: [
                Vec2::new(min.x, min.y),
                Vec2::new(max.x, min.y),
                Vec2::new(max.x, max.y),
                Vec2::new(min.x, max.y),
            ],
        }
    }
}

/// UV window selecting `src` (in texels) out of a texture of the given size.
pub fn source_uv(src: Rect, texture_width: u32, texture_height: u32) -> RectParams {
    let tw = texture_width as f32;
    let th = texture_height as f32;
    RectParams {
        min_uv: Vec2::new(src.x as f32 / tw, src.y as f32 / th),
        max_uv: Vec2::new(src.right() as f32 / tw, src.bottom() as f32 / th),
        ..RectParams::default()
    }
}

/// World transform that maps the unit quad onto `dest`, mirrored per `flip`.
pub fn sprite_transform(dest: Rect, flip: Flip) -> Mat4 {
    let (sx, sy) = flip.scale_signs();
    let center = Vec3::new(
        dest.x as f32 + dest.w as f32 * 0.5,
        dest.y as f32 + dest.h as f32 * 0.5,
        0.0,
    );
    let scale = Vec3::new(dest.w as f32 * sx, dest.h as f32 * sy, 1.0);
    Mat4::from_translation(center) * Mat4::from_scale(scale)
}

/// Orthographic projection with y pointing down across `screen`.
pub fn screen_projection(screen: Rect) -> Mat4 {
    Mat4::orthographic_rh(
        screen.x as f32,
        screen.right() as f32,
        screen.bottom() as f32,
        screen.y as f32,
        -1.0,
        1.0,
    )
}
