//! Procedural star catalog: deterministic directions, magnitudes, and colors.

use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Brightest magnitude the generator produces.
const BRIGHTEST_MAGNITUDE: f32 = -1.5;

/// Slope of `log10 N(<m)`: star counts grow about 4x per magnitude.
const COUNT_SLOPE: f32 = 0.6;

/// One catalog entry.
#[derive(Clone, Debug)]
pub struct CatalogStar {
    /// Unit direction on the sky sphere.
    pub direction: DVec3,
    /// Visual magnitude.
    pub magnitude: f32,
    /// Quantized B-V index in `[0, 127]`.
    pub bv_index: u8,
}

/// Generates a deterministic star catalog from a seed.
pub struct CatalogGenerator {
    seed: u64,
    star_count: u32,
    faintest_magnitude: f32,
}

impl CatalogGenerator {
    pub fn new(seed: u64, star_count: u32, faintest_magnitude: f32) -> Self {
        Self {
            seed,
            star_count,
            faintest_magnitude,
        }
    }

    /// Generate the catalog, sorted brightest first.
    pub fn generate(&self) -> Vec<CatalogStar> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut stars = Vec::with_capacity(self.star_count as usize);

        for _ in 0..self.star_count {
            let theta = rng.random::<f64>() * std::f64::consts::TAU;
            let phi = (1.0 - 2.0 * rng.random::<f64>()).acos();
            let direction =
                DVec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos());

            // Inverse of the cumulative count law: many faint, few bright.
            let u: f32 = rng.random_range(f32::EPSILON..1.0);
            let magnitude =
                (self.faintest_magnitude + u.log10() / COUNT_SLOPE).max(BRIGHTEST_MAGNITUDE);

            // Most stars sit around B-V 0.6; the sum of two uniforms peaks there.
            let spread: f32 = rng.random::<f32>() + rng.random::<f32>();
            let bv_index = (spread * 0.5 * 80.0 + 10.0) as u8;

            stars.push(CatalogStar {
                direction,
                magnitude,
                bv_index,
            });
        }

        stars.sort_by(|a, b| a.magnitude.total_cmp(&b.magnitude));
        stars
    }
}
