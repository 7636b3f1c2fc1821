//! B-V color index lookup: 128 quantized color indices mapped to linear RGB.
//!
//! The table is built once from a sparse list of `(B-V, RGB)` samples by linear
//! interpolation and is immutable afterwards. Drawers share it through an `Arc`.

use std::sync::OnceLock;

use nebula_config::BvColor;
use thiserror::Error;

/// Number of quantized B-V levels.
pub const COLOR_TABLE_SIZE: usize = 128;

/// Largest valid quantized B-V index.
pub const MAX_BV_INDEX: u8 = (COLOR_TABLE_SIZE - 1) as u8;

/// Errors returned when building a [`ColorTable`].
#[derive(Debug, Error, PartialEq)]
pub enum ColorTableError {
    /// Interpolation needs at least two distinct samples.
    #[error("color table needs at least 2 B-V samples, got {count}")]
    TooFewSamples {
        /// Number of usable samples provided.
        count: usize,
    },
}

/// Convert a quantized B-V index to its B-V color value.
///
/// Index 0 maps to -0.5 and index 127 to 3.5. Larger indices are clamped.
pub fn index_to_bv(index: u8) -> f32 {
    let index = index.min(MAX_BV_INDEX);
    index as f32 * 4.0 / 127.0 - 0.5
}

/// Immutable quantized B-V to RGB table.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorTable {
    colors: [[f32; 3]; COLOR_TABLE_SIZE],
}

impl ColorTable {
    /// Build the table by interpolating between the given samples.
    ///
    /// Samples may come in any order. B-V values outside the sampled range take
    /// the color of the nearest end sample. Non-finite samples are skipped.
    pub fn from_samples(samples: &[BvColor]) -> Result<Self, ColorTableError> {
        let mut sorted: Vec<BvColor> = samples
            .iter()
            .copied()
            .filter(|s| s.bv.is_finite())
            .collect();
        sorted.sort_by(|a, b| a.bv.total_cmp(&b.bv));
        sorted.dedup_by(|a, b| a.bv == b.bv);

        if sorted.len() < 2 {
            return Err(ColorTableError::TooFewSamples {
                count: sorted.len(),
            });
        }

        let colors = std::array::from_fn(|i| interpolate(&sorted, index_to_bv(i as u8)));
        Ok(Self { colors })
    }

    /// The table built from the default configuration samples, shared process-wide.
    pub fn builtin() -> &'static ColorTable {
        static BUILTIN: OnceLock<ColorTable> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            let samples = nebula_config::ColorConfig::default().bv_colors;
            match Self::from_samples(&samples) {
                Ok(table) => table,
                Err(_) => Self {
                    colors: [[1.0; 3]; COLOR_TABLE_SIZE],
                },
            }
        })
    }

    /// RGB color for a quantized B-V index. Indices above 127 are clamped.
    pub fn index_to_color(&self, index: u8) -> [f32; 3] {
        self.colors[index.min(MAX_BV_INDEX) as usize]
    }

    /// All 128 entries in index order.
    pub fn colors(&self) -> &[[f32; 3]; COLOR_TABLE_SIZE] {
        &self.colors
    }
}

/// Linear interpolation over samples sorted by B-V (at least two entries).
fn interpolate(sorted: &[BvColor], bv: f32) -> [f32; 3] {
    let upper = sorted.partition_point(|s| s.bv <= bv);
    if upper == 0 {
        return sorted[0].rgb;
    }
    if upper == sorted.len() {
        return sorted[sorted.len() - 1].rgb;
    }
    let lo = sorted[upper - 1];
    let hi = sorted[upper];
    let t = (bv - lo.bv) / (hi.bv - lo.bv);
    std::array::from_fn(|c| lo.rgb[c] + (hi.rgb[c] - lo.rgb[c]) * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(bv: f32, rgb: [f32; 3]) -> BvColor {
        BvColor { bv, rgb }
    }

    #[test]
    fn test_index_to_bv_endpoints_are_exact() {
        assert_eq!(index_to_bv(0), -0.5);
        assert_eq!(index_to_bv(127), 3.5);
    }

    #[test]
    fn test_index_to_bv_strictly_increasing() {
        for i in 0..MAX_BV_INDEX {
            assert!(
                index_to_bv(i + 1) > index_to_bv(i),
                "index_to_bv({}) should exceed index_to_bv({i})",
                i + 1
            );
        }
    }

    #[test]
    fn test_index_to_bv_clamps_large_indices() {
        assert_eq!(index_to_bv(200), 3.5);
    }

    #[test]
    fn test_too_few_samples_rejected() {
        let result = ColorTable::from_samples(&[sample(0.0, [1.0, 1.0, 1.0])]);
        assert_eq!(result, Err(ColorTableError::TooFewSamples { count: 1 }));

        let duplicated = [sample(0.3, [1.0; 3]), sample(0.3, [0.0; 3])];
        assert!(ColorTable::from_samples(&duplicated).is_err());
    }

    #[test]
    fn test_interpolates_between_samples() {
        let table =
            ColorTable::from_samples(&[sample(-0.5, [0.0, 0.0, 1.0]), sample(3.5, [1.0, 0.0, 0.0])])
                .unwrap();
        let mid = table.index_to_color(127 / 2);
        let t = (index_to_bv(63) + 0.5) / 4.0;
        assert!((mid[0] - t).abs() < 1e-5);
        assert!((mid[2] - (1.0 - t)).abs() < 1e-5);
        assert_eq!(table.index_to_color(0), [0.0, 0.0, 1.0]);
        assert_eq!(table.index_to_color(127), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_out_of_range_uses_nearest_sample() {
        let table =
            ColorTable::from_samples(&[sample(1.0, [0.2, 0.2, 0.2]), sample(0.0, [0.8, 0.8, 0.8])])
                .unwrap();
        assert_eq!(table.index_to_color(0), [0.8, 0.8, 0.8]);
        assert_eq!(table.index_to_color(127), [0.2, 0.2, 0.2]);
    }

    #[test]
    fn test_builtin_table_blue_to_red() {
        let table = ColorTable::builtin();
        let hot = table.index_to_color(0);
        let cool = table.index_to_color(MAX_BV_INDEX);
        assert!(hot[2] > hot[0], "negative B-V should be blue-ish: {hot:?}");
        assert!(cool[0] > cool[2], "large B-V should be red-ish: {cool:?}");
        for rgb in table.colors() {
            for &c in rgb {
                assert!((0.0..=1.0).contains(&c));
            }
        }
    }
}
