//! Tone mapping: world luminance to displayable intensity.
//!
//! The drawer only talks to the [`ToneMapper`] trait. [`ToneReproducer`] is the
//! bundled implementation, a Tumblin-Rushmeier operator parameterized by the
//! current world adaptation luminance.

use std::f32::consts::PI;

/// Converts world luminances into display luminances for one adaptation state.
pub trait ToneMapper {
    /// Set the luminance (cd/m^2) the eye is adapted to.
    fn set_world_adaptation_luminance(&mut self, lum: f32);

    /// The luminance (cd/m^2) the eye is adapted to.
    fn world_adaptation_luminance(&self) -> f32;

    /// Set the scale applied to input luminances before conversion.
    fn set_input_scale(&mut self, scale: f32);

    /// The scale applied to input luminances before conversion.
    fn input_scale(&self) -> f32;

    /// Display luminance of `world_lum`, normalized so 1.0 is the display maximum.
    fn adapt_luminance_scaled(&self, world_lum: f32) -> f32;

    /// Same as [`adapt_luminance_scaled`](Self::adapt_luminance_scaled) from
    /// the natural log of the world luminance, raised to `p_fact`.
    fn adapt_luminance_scaled_ln(&self, ln_world_lum: f32, p_fact: f32) -> f32;
}

/// Display adaptation luminance in cd/m^2.
const DISPLAY_ADAPTATION_LUMINANCE: f32 = 50.0;

/// Maximum display luminance in cd/m^2.
const MAX_DISPLAY_LUMINANCE: f32 = 100.0;

/// World luminances are clamped to this minimum before taking logs.
pub const MIN_WORLD_LUMINANCE: f32 = 1e-4;

/// `ln(pi * 1e-4)`: converts cd/m^2 to lamberts in log space.
const LN_PI_1E_4: f32 = -8.065_61;

fn alpha(log10_lum: f32) -> f32 {
    0.4 * log10_lum + 1.619
}

fn beta(log10_lum: f32) -> f32 {
    -0.4 * log10_lum * log10_lum + 0.218 * log10_lum + 6.1642
}

/// Tumblin-Rushmeier tone reproduction operator.
#[derive(Clone, Debug)]
pub struct ToneReproducer {
    world_lum: f32,
    input_scale: f32,
    ln_input_scale: f32,
    alpha_da: f32,
    beta_da: f32,
    alpha_wa_over_alpha_da: f32,
    term2: f32,
    ln_term2: f32,
    ln_one_over_max_dl: f32,
}

impl ToneReproducer {
    /// Create an operator adapted to `world_lum` cd/m^2 with unit input scale.
    pub fn new(world_lum: f32) -> Self {
        let log10_da = DISPLAY_ADAPTATION_LUMINANCE.log10();
        let mut tone = Self {
            world_lum: 0.0,
            input_scale: 1.0,
            ln_input_scale: 0.0,
            alpha_da: alpha(log10_da),
            beta_da: beta(log10_da),
            alpha_wa_over_alpha_da: 1.0,
            term2: 1.0,
            ln_term2: 0.0,
            ln_one_over_max_dl: (1.0 / MAX_DISPLAY_LUMINANCE).ln(),
        };
        tone.set_world_adaptation_luminance(world_lum);
        tone
    }

    /// Unnormalized display luminance of `world_lum` in cd/m^2.
    pub fn adapt_luminance(&self, world_lum: f32) -> f32 {
        (self.input_scale * world_lum * PI * 1e-4).powf(self.alpha_wa_over_alpha_da) * self.term2
    }
}

impl Default for ToneReproducer {
    fn default() -> Self {
        Self::new(DISPLAY_ADAPTATION_LUMINANCE)
    }
}

impl ToneMapper for ToneReproducer {
    fn set_world_adaptation_luminance(&mut self, lum: f32) {
        self.world_lum = lum.max(MIN_WORLD_LUMINANCE);
        let log10_wa = self.world_lum.log10();
        let alpha_wa = alpha(log10_wa);
        let beta_wa = beta(log10_wa);
        self.alpha_wa_over_alpha_da = alpha_wa / self.alpha_da;
        self.term2 = 10f32.powf((beta_wa - self.beta_da) / self.alpha_da) / (PI * 1e-4);
        self.ln_term2 = self.term2.ln();
    }

    fn world_adaptation_luminance(&self) -> f32 {
        self.world_lum
    }

    fn set_input_scale(&mut self, scale: f32) {
        self.input_scale = scale;
        self.ln_input_scale = scale.ln();
    }

    fn input_scale(&self) -> f32 {
        self.input_scale
    }

    fn adapt_luminance_scaled(&self, world_lum: f32) -> f32 {
        self.adapt_luminance(world_lum) / MAX_DISPLAY_LUMINANCE
    }

    fn adapt_luminance_scaled_ln(&self, ln_world_lum: f32, p_fact: f32) -> f32 {
        (((self.ln_input_scale + ln_world_lum + LN_PI_1E_4) * self.alpha_wa_over_alpha_da
            + self.ln_term2
            + self.ln_one_over_max_dl)
            * p_fact)
            .exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_monotonic_in_world_luminance() {
        let tone = ToneReproducer::new(0.1);
        let mut previous = 0.0;
        for exp in -6..6 {
            let lum = 10f32.powi(exp);
            let display = tone.adapt_luminance_scaled(lum);
            assert!(display > previous, "display must grow with luminance at 1e{exp}");
            previous = display;
        }
    }

    #[test]
    fn test_ln_variant_matches_linear_variant() {
        let mut tone = ToneReproducer::new(3.0);
        tone.set_input_scale(0.7);
        for lum in [1e-3_f32, 0.2, 5.0, 800.0] {
            let linear = tone.adapt_luminance_scaled(lum);
            let from_ln = tone.adapt_luminance_scaled_ln(lum.ln(), 1.0);
            assert!(
                ((linear - from_ln) / linear).abs() < 1e-3,
                "linear {linear} vs ln {from_ln} at {lum}"
            );
        }
    }

    #[test]
    fn test_brighter_adaptation_dims_faint_sources() {
        let dark = ToneReproducer::new(0.01);
        let bright = ToneReproducer::new(1000.0);
        assert!(dark.adapt_luminance_scaled(0.05) > bright.adapt_luminance_scaled(0.05));
    }

    #[test]
    fn test_input_scale_brightens() {
        let mut tone = ToneReproducer::new(0.1);
        let before = tone.adapt_luminance_scaled_ln(-3.0, 0.7);
        tone.set_input_scale(2.0);
        assert!(tone.adapt_luminance_scaled_ln(-3.0, 0.7) > before);
        assert_eq!(tone.input_scale(), 2.0);
    }

    #[test]
    fn test_world_luminance_is_clamped() {
        let mut tone = ToneReproducer::default();
        tone.set_world_adaptation_luminance(0.0);
        assert_eq!(tone.world_adaptation_luminance(), MIN_WORLD_LUMINANCE);
        assert!(tone.adapt_luminance_scaled(1.0).is_finite());
    }
}
