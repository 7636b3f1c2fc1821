//! Magnitude, luminance, and surface brightness conversions.
//!
//! Point sources convert through a field-of-view dependent gain: the narrower
//! the view, the more light the simulated instrument gathers, so the same
//! magnitude maps to a higher luminance. Extended sources convert through their
//! surface brightness, which does not depend on the view.

/// `ln(10) / 2.5`: natural-log slope of the magnitude scale.
pub const MAG_LN_SLOPE: f32 = 0.92103;

/// Magnitude zero point of the luminance scale.
pub const MAG_ZERO_POINT: f32 = 12.12331;

/// FOV (degrees) at which the instrument gain is neutral.
pub const REFERENCE_FOV: f32 = 60.0;

/// Luminance gain at [`REFERENCE_FOV`].
pub const FOV_LUMINANCE_GAIN: f32 = 2.15;

/// Below this FOV the instrument power factor stops growing.
const MIN_POWER_FACTOR_FOV: f32 = 0.7;

/// Exponent of the FOV power law, blending naked eye into telescope views.
const POWER_FACTOR_EXPONENT: f32 = 0.8;

/// Converts (mag/arcmin^2) surface brightness to cd/m^2.
const SURFACE_BRIGHTNESS_SCALE: f64 = 2.0 * 2_025_000.0 * 3600.0;

/// Instrument power factor for a field of view in degrees.
///
/// Grows as a power law when zooming in so the transition from naked eye to
/// binoculars and telescopes is smooth. It multiplies the input scale given to
/// the tone mapper.
pub fn fov_power_factor(fov_deg: f32) -> f32 {
    (REFERENCE_FOV / fov_deg.max(MIN_POWER_FACTOR_FOV)).powf(POWER_FACTOR_EXPONENT)
}

/// Point source conversions for one field of view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhotometricModel {
    fov_deg: f32,
    ln_fov_factor: f32,
}

impl PhotometricModel {
    /// Build the model for a field of view in degrees.
    pub fn for_fov(fov_deg: f32) -> Self {
        let ratio = REFERENCE_FOV / fov_deg;
        let ln_fov_factor = (FOV_LUMINANCE_GAIN * ratio * ratio / fov_power_factor(fov_deg)).ln();
        Self {
            fov_deg,
            ln_fov_factor,
        }
    }

    /// The field of view this model was built for.
    pub fn fov(&self) -> f32 {
        self.fov_deg
    }

    /// Power factor of [`fov_power_factor`] for this model's FOV.
    pub fn power_factor(&self) -> f32 {
        fov_power_factor(self.fov_deg)
    }

    /// Natural log of the FOV gain term.
    pub fn ln_fov_factor(&self) -> f32 {
        self.ln_fov_factor
    }

    /// Natural log of the luminance of a point source of V magnitude `mag`.
    pub fn magnitude_to_ln_luminance(&self, mag: f32) -> f32 {
        -MAG_LN_SLOPE * (mag + MAG_ZERO_POINT) + self.ln_fov_factor
    }

    /// Luminance in cd/m^2 of a point source of V magnitude `mag`.
    pub fn magnitude_to_luminance(&self, mag: f32) -> f32 {
        self.magnitude_to_ln_luminance(mag).exp()
    }

    /// V magnitude of a point source with luminance `lum` (cd/m^2).
    pub fn luminance_to_magnitude(&self, lum: f32) -> f32 {
        (lum.ln() - self.ln_fov_factor) / -MAG_LN_SLOPE - MAG_ZERO_POINT
    }
}

impl Default for PhotometricModel {
    fn default() -> Self {
        Self::for_fov(REFERENCE_FOV)
    }
}

/// Luminance in cd/m^2 of an extended source with surface brightness `sb`
/// in V mag/arcmin^2.
pub fn surface_brightness_to_luminance(sb: f32) -> f32 {
    let ln_slope = MAG_LN_SLOPE as f64;
    let zero = MAG_ZERO_POINT as f64;
    (SURFACE_BRIGHTNESS_SCALE * (-ln_slope * (sb as f64 + zero)).exp()) as f32
}

/// Surface brightness in V mag/arcmin^2 of an extended source of luminance
/// `lum` in cd/m^2.
pub fn luminance_to_surface_brightness(lum: f32) -> f32 {
    let ln_slope = MAG_LN_SLOPE as f64;
    let zero = MAG_ZERO_POINT as f64;
    ((lum as f64 / SURFACE_BRIGHTNESS_SCALE).ln() / -ln_slope - zero) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_strictly_decreasing_in_magnitude() {
        for fov in [0.5, 10.0, 60.0, 120.0] {
            let model = PhotometricModel::for_fov(fov);
            let mut previous = model.magnitude_to_luminance(-5.0);
            let mut mag = -4.5;
            while mag <= 30.0 {
                let lum = model.magnitude_to_luminance(mag);
                assert!(
                    lum < previous,
                    "luminance must drop from mag {} to {mag} at fov {fov}",
                    mag - 0.5
                );
                previous = lum;
                mag += 0.5;
            }
        }
    }

    #[test]
    fn test_magnitude_roundtrip() {
        for fov in [1.0, 60.0, 180.0] {
            let model = PhotometricModel::for_fov(fov);
            let mut mag = -5.0;
            while mag <= 30.0 {
                let back = model.luminance_to_magnitude(model.magnitude_to_luminance(mag));
                assert!(
                    (back - mag).abs() < 1e-3,
                    "mag {mag} came back as {back} at fov {fov}"
                );
                mag += 0.25;
            }
        }
    }

    #[test]
    fn test_narrow_fov_is_brighter() {
        let wide = PhotometricModel::for_fov(60.0);
        let narrow = PhotometricModel::for_fov(1.0);
        assert!(narrow.magnitude_to_luminance(6.0) > wide.magnitude_to_luminance(6.0));
    }

    #[test]
    fn test_power_factor_neutral_at_reference() {
        assert!((fov_power_factor(REFERENCE_FOV) - 1.0).abs() < 1e-6);
        assert_eq!(fov_power_factor(0.1), fov_power_factor(0.7));
        assert!(fov_power_factor(10.0) > 1.0);
    }

    #[test]
    fn test_reference_gain() {
        let model = PhotometricModel::default();
        assert!((model.ln_fov_factor() - FOV_LUMINANCE_GAIN.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_surface_brightness_roundtrip() {
        let mut sb = -5.0_f32;
        while sb <= 30.0 {
            let back = luminance_to_surface_brightness(surface_brightness_to_luminance(sb));
            assert!(
                (back - sb).abs() <= 1e-4 * sb.abs().max(1.0),
                "sb {sb} came back as {back}"
            );
            sb += 0.5;
        }
    }

    #[test]
    fn test_luminance_roundtrip_through_surface_brightness() {
        for lum in [1e-6_f32, 1e-3, 0.5, 1.0, 42.0, 1e4, 1e7] {
            let back = surface_brightness_to_luminance(luminance_to_surface_brightness(lum));
            assert!(
                ((back - lum) / lum).abs() < 1e-4,
                "luminance {lum} came back as {back}"
            );
        }
    }
}
