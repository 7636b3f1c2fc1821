//! Drawing surface the sky drawer submits halos to.

use glam::Vec2;

use crate::batch::PointSourceBatch;
use crate::projector::Projector;

/// Texture/blend setup a submission should be rasterized with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpriteKind {
    /// Small point-spread halo of a star.
    Halo,
    /// Large faint halo layered under very bright stars.
    BigHalo,
    /// Glare sprite of the Sun.
    SunHalo,
    /// Single-pixel style sprite used in point-star mode.
    Point,
}

/// A render target that knows how to project and rasterize halos.
pub trait SkySurface {
    /// Projection for the current view.
    fn projector(&self) -> &dyn Projector;

    /// Rasterize every entry of `batch` with additive blending.
    fn submit_point_sources(&mut self, kind: SpriteKind, batch: &PointSourceBatch);

    /// Rasterize one additive sprite centered on `center`.
    fn draw_sprite(&mut self, kind: SpriteKind, center: Vec2, radius: f32, rgb: [f32; 3]);
}
