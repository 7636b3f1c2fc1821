//! Point source batching: accumulate halo sprites for one flush.
//!
//! Entries live in parallel arrays so a surface can upload positions, radii,
//! and colors without re-packing. Logical capacity is tracked next to the
//! length and doubles when exceeded; storage is reserved with fallible
//! allocation so a failed growth leaves the existing entries untouched.

use std::collections::TryReserveError;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use thiserror::Error;

/// Capacity reserved by the first growth.
pub const INITIAL_BATCH_CAPACITY: usize = 1000;

/// Vertices emitted per point source (two triangles).
pub const VERTICES_PER_SOURCE: usize = 6;

/// Errors raised while appending to a [`PointSourceBatch`].
#[derive(Debug, Error)]
pub enum BatchError {
    /// Storage for more entries could not be reserved.
    #[error("failed to grow point source batch to {requested} entries")]
    GrowthFailed {
        /// Capacity that was requested.
        requested: usize,
        /// Allocator error.
        #[source]
        source: TryReserveError,
    },
}

/// One accepted point source, in screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointSourceEntry {
    /// Screen position in pixels.
    pub position: Vec2,
    /// Halo radius in pixels.
    pub radius: f32,
    /// Intensity multiplier in `[0, 1]`.
    pub luminance: f32,
    /// Linear RGB color.
    pub color: [f32; 3],
}

impl PointSourceEntry {
    /// Color scaled by intensity, as written to vertices.
    pub fn premultiplied_color(&self) -> [f32; 3] {
        self.color.map(|c| c * self.luminance)
    }
}

/// GPU vertex for one corner of a halo sprite.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct HaloVertex {
    /// Screen position in pixels.
    pub position: [f32; 2],
    /// Halo texture coordinate.
    pub uv: [f32; 2],
    /// Premultiplied linear RGB.
    pub color: [f32; 3],
}

impl HaloVertex {
    /// Vertex buffer layout: position, uv, color.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<HaloVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 0,
                shader_location: 0,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 8,
                shader_location: 1,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 16,
                shader_location: 2,
            },
        ],
    };
}

/// Growable parallel buffers of point sources awaiting one draw submission.
#[derive(Debug, Default)]
pub struct PointSourceBatch {
    positions: Vec<Vec2>,
    radii: Vec<f32>,
    luminances: Vec<f32>,
    colors: Vec<[f32; 3]>,
    capacity: usize,
}

impl PointSourceBatch {
    /// Create an empty batch. Nothing is allocated until the first push.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a batch with `capacity` entries reserved up front.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            radii: Vec::with_capacity(capacity),
            luminances: Vec::with_capacity(capacity),
            colors: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, doubling the capacity first when full.
    pub fn push(&mut self, entry: PointSourceEntry) -> Result<(), BatchError> {
        if self.len() == self.capacity {
            self.grow()?;
        }
        self.positions.push(entry.position);
        self.radii.push(entry.radius);
        self.luminances.push(entry.luminance);
        self.colors.push(entry.color);
        Ok(())
    }

    fn grow(&mut self) -> Result<(), BatchError> {
        let requested = self.capacity.saturating_mul(2).max(INITIAL_BATCH_CAPACITY);
        self.reserve_total(requested)
    }

    /// Reserve room for `requested` entries in every buffer. On failure the
    /// entries and the reported capacity are left untouched.
    fn reserve_total(&mut self, requested: usize) -> Result<(), BatchError> {
        let additional = requested.saturating_sub(self.len());
        let reserve = |result: Result<(), TryReserveError>| {
            result.map_err(|source| BatchError::GrowthFailed { requested, source })
        };
        reserve(self.positions.try_reserve_exact(additional))?;
        reserve(self.radii.try_reserve_exact(additional))?;
        reserve(self.luminances.try_reserve_exact(additional))?;
        reserve(self.colors.try_reserve_exact(additional))?;
        self.capacity = requested;
        Ok(())
    }

    /// Clear the batch for reuse next frame, keeping allocated capacity.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.radii.clear();
        self.luminances.clear();
        self.colors.clear();
    }

    /// Number of entries in the batch.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the batch contains no entries.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of entries that fit before the next growth.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Screen positions in insertion order.
    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    /// Halo radii in insertion order.
    pub fn radii(&self) -> &[f32] {
        &self.radii
    }

    /// Intensities in insertion order.
    pub fn luminances(&self) -> &[f32] {
        &self.luminances
    }

    /// Colors in insertion order.
    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    /// Entry at `index`, if present.
    pub fn get(&self, index: usize) -> Option<PointSourceEntry> {
        Some(PointSourceEntry {
            position: *self.positions.get(index)?,
            radius: self.radii[index],
            luminance: self.luminances[index],
            color: self.colors[index],
        })
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = PointSourceEntry> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    /// Append two triangles per entry to `out`, ready for upload.
    pub fn write_vertices(&self, out: &mut Vec<HaloVertex>) {
        out.reserve(self.len() * VERTICES_PER_SOURCE);
        for entry in self.iter() {
            let color = entry.premultiplied_color();
            let Vec2 { x, y } = entry.position;
            let r = entry.radius;
            let corner = |dx: f32, dy: f32, u: f32, v: f32| HaloVertex {
                position: [x + dx, y + dy],
                uv: [u, v],
                color,
            };
            let bl = corner(-r, -r, 0.0, 0.0);
            let br = corner(r, -r, 1.0, 0.0);
            let tr = corner(r, r, 1.0, 1.0);
            let tl = corner(-r, r, 0.0, 1.0);
            out.extend_from_slice(&[bl, br, tr, bl, tr, tl]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(i: usize) -> PointSourceEntry {
        PointSourceEntry {
            position: Vec2::new(i as f32, 2.0 * i as f32),
            radius: 1.5,
            luminance: 0.5,
            color: [1.0, 0.5, 0.25],
        }
    }

    #[test]
    fn test_empty_batch() {
        let batch = PointSourceBatch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
        assert_eq!(batch.capacity(), 0);
        assert_eq!(batch.iter().count(), 0);
    }

    #[test]
    fn test_first_push_reserves_initial_capacity() {
        let mut batch = PointSourceBatch::new();
        batch.push(entry(0)).unwrap();
        assert_eq!(batch.capacity(), INITIAL_BATCH_CAPACITY);
    }

    #[test]
    fn test_capacity_doubles_and_preserves_entries() {
        let mut batch = PointSourceBatch::new();
        for i in 0..2500 {
            batch.push(entry(i)).unwrap();
            assert!(batch.len() <= batch.capacity());
        }
        assert_eq!(batch.capacity(), 4000);
        for i in [0, 999, 1000, 2499] {
            assert_eq!(batch.get(i), Some(entry(i)), "entry {i} changed after growth");
        }
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut batch = PointSourceBatch::with_capacity(16);
        for i in 0..10 {
            batch.push(entry(i)).unwrap();
        }
        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.capacity(), 16);
    }

    #[test]
    fn test_parallel_buffers_stay_aligned() {
        let mut batch = PointSourceBatch::new();
        for i in 0..5 {
            batch.push(entry(i)).unwrap();
        }
        assert_eq!(batch.positions().len(), 5);
        assert_eq!(batch.radii().len(), 5);
        assert_eq!(batch.luminances().len(), 5);
        assert_eq!(batch.colors().len(), 5);
        assert_eq!(batch.positions()[3], Vec2::new(3.0, 6.0));
    }

    #[test]
    fn test_vertices_cover_halo_quad() {
        let mut batch = PointSourceBatch::new();
        batch.push(entry(4)).unwrap();
        let mut vertices = Vec::new();
        batch.write_vertices(&mut vertices);
        assert_eq!(vertices.len(), VERTICES_PER_SOURCE);

        let xs: Vec<f32> = vertices.iter().map(|v| v.position[0]).collect();
        let min_x = xs.iter().cloned().fold(f32::MAX, f32::min);
        let max_x = xs.iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(max_x - min_x, 3.0);
        assert_eq!(vertices[0].color, [0.5, 0.25, 0.125]);
    }

    #[test]
    fn test_vertex_is_pod() {
        let vertices = [HaloVertex::zeroed(); 2];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 2 * 28);
        assert_eq!(HaloVertex::LAYOUT.array_stride, 28);
    }

    #[test]
    fn test_failed_growth_leaves_batch_unchanged() {
        let mut batch = PointSourceBatch::new();
        for i in 0..3 {
            batch.push(entry(i)).unwrap();
        }
        let capacity = batch.capacity();

        let result = batch.reserve_total(usize::MAX);
        assert!(matches!(
            result,
            Err(BatchError::GrowthFailed { requested: usize::MAX, .. })
        ));
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.capacity(), capacity);
        assert_eq!(batch.get(2), Some(entry(2)));

        batch.push(entry(3)).unwrap();
        assert_eq!(batch.len(), 4);
        assert_eq!(batch.capacity(), capacity);
    }
}
