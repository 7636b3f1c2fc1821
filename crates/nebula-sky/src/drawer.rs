//! The sky drawer: per-frame eye adaptation, point source sizing, and halo
//! batching.
//!
//! Call order per frame:
//!
//! 1. [`SkyDrawer::update`] once, with the frame time and field of view.
//! 2. [`SkyDrawer::pre_draw`], then any number of point source sessions:
//!    [`pre_draw_point_source`](SkyDrawer::pre_draw_point_source), repeated
//!    [`draw_point_source`](SkyDrawer::draw_point_source), and
//!    [`post_draw_point_source`](SkyDrawer::post_draw_point_source).
//! 3. Luminances reported with
//!    [`report_luminance_in_fov`](SkyDrawer::report_luminance_in_fov) during
//!    the frame feed the next `update`.

use std::f32::consts::PI;
use std::sync::Arc;

use glam::DVec3;
use nebula_config::{BvColor, Config};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::adaptation::AdaptationState;
use crate::batch::{PointSourceBatch, PointSourceEntry};
use crate::color::{self, ColorTable};
use crate::error::SkyDrawerError;
use crate::limit::{
    LN_INPUT_SCALE_SEARCH, LOG_LUMINANCE_SEARCH, LOG_WORLD_LUMINANCE_SEARCH, MAGNITUDE_SEARCH,
};
use crate::photometry::{self, PhotometricModel, REFERENCE_FOV};
use crate::surface::{SkySurface, SpriteKind};
use crate::tone::{ToneMapper, ToneReproducer};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Halos smaller than this (pixels) are not drawn.
const MIN_VISIBLE_RADIUS: f32 = 0.5;

/// Radius below which a star is drawn at fixed size with reduced intensity.
const MIN_HALO_RADIUS: f32 = 1.2;

/// Radius of every star in point-star mode.
const POINT_STAR_RADIUS: f32 = 1.0;

/// Radii above this grow with a square root.
const SOFT_RADIUS_LIMIT: f32 = 8.0;

/// Hard cap on halo radius.
const MAX_HALO_RADIUS: f32 = 64.0;

/// Small halo radius above which a big halo is layered underneath.
const BIG_HALO_THRESHOLD: f32 = SOFT_RADIUS_LIMIT + 5.0;

/// Radius of the big halo sprite.
const BIG_HALO_RADIUS: f32 = 150.0;

/// Radius span over which the big halo fades in.
const BIG_HALO_FADE_SPAN: f32 = 30.0;

/// Exponent applied to tone mapped star luminance, scaled by the relative scale.
const STAR_LUMINANCE_EXPONENT: f32 = 0.7;

/// Base of the linear star scale, raised to `1.4 * relative_scale`.
const LINEAR_SCALE_BASE: f32 = 70.0;
const LINEAR_SCALE_EXPONENT: f32 = 1.4;

/// Display luminance at which an extended object becomes visible.
const EXTENDED_VISIBILITY_THRESHOLD: f32 = 0.05;

/// Objects brighter than this magnitude are drawn with the Sun glare sprite.
const SUN_MAGNITUDE: f32 = -15.0;

/// Scale of the Sun glare radius per magnitude above [`SUN_MAGNITUDE`].
const SUN_HALO_RADIUS_SCALE: f32 = 150.0 / 11.0;

/// Pixel margin around the disk inside which the Sun glare fades out.
const SUN_HALO_FADE_MARGIN: f32 = 100.0;

/// Disk radius (pixels) at which the halo of a resolved body starts fading.
const DISK_FADE_START: f32 = 2.0;

/// Disk radius (pixels) at which the halo of a resolved body is gone.
const DISK_FADE_STOP: f32 = 6.0;

/// Luminance reported for a resolved body is the world luminance that gives
/// its halo radius, divided by this.
const SKY_3D_MODEL_LUMINANCE_DIVISOR: f32 = 50.0;

/// Cap on the luminance reported for a resolved body, in cd/m^2.
const SKY_3D_MODEL_MAX_LUMINANCE: f32 = 700.0;

/// Reported luminance cap at the reference field of view; scales with
/// `(60 / fov)^2`.
const SKY_3D_MODEL_FOV_LUMINANCE: f32 = 6.0;

/// Valid Bortle scale indices.
const BORTLE_MIN: i32 = 1;
const BORTLE_MAX: i32 = 9;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Initial drawer parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SkyDrawerSettings {
    pub twinkle_amount: f32,
    pub flag_twinkle: bool,
    pub flag_point_star: bool,
    pub max_adapt_fov: f32,
    pub min_adapt_fov: f32,
    pub luminance_adaptation: bool,
    pub bortle_scale: i32,
    pub relative_scale: f32,
    pub absolute_scale: f32,
    /// Default world luminance in cd/m^2.
    pub world_luminance_floor: f32,
    /// e-folding time of slow eye adaptation, in seconds.
    pub adaptation_time_constant_s: f32,
    /// Naked eye limiting magnitude of each Bortle class, darkest first.
    pub bortle_limit_magnitudes: [f32; 9],
    pub twinkle_seed: u64,
    pub bv_colors: Vec<BvColor>,
}

impl From<&Config> for SkyDrawerSettings {
    fn from(config: &Config) -> Self {
        let stars = &config.stars;
        let viewing = &config.viewing;
        Self {
            twinkle_amount: stars.twinkle_amount,
            flag_twinkle: stars.flag_twinkle,
            flag_point_star: stars.flag_point_star,
            max_adapt_fov: stars.max_adapt_fov,
            min_adapt_fov: stars.min_adapt_fov,
            luminance_adaptation: viewing.luminance_adaptation,
            bortle_scale: stars.init_bortle_scale,
            relative_scale: stars.relative_scale,
            absolute_scale: stars.absolute_scale,
            world_luminance_floor: viewing.world_luminance_floor,
            adaptation_time_constant_s: viewing.adaptation_time_constant_s,
            bortle_limit_magnitudes: stars.bortle_limit_magnitudes,
            twinkle_seed: stars.twinkle_seed,
            bv_colors: config.colors.bv_colors.clone(),
        }
    }
}

impl Default for SkyDrawerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

// ---------------------------------------------------------------------------
// Drawer
// ---------------------------------------------------------------------------

/// On-screen size and intensity of a point source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RcMag {
    /// Halo radius in pixels.
    pub radius: f32,
    /// Intensity multiplier in `[0, 1]`.
    pub luminance: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Session {
    Idle,
    Active,
    /// A batch failed to grow; draws are dropped until the session closes.
    Aborted,
}

/// Photometric sky drawer.
///
/// Decides how large and bright each point source appears for the current eye
/// adaptation, field of view, and light pollution, and batches the resulting
/// halos for a [`SkySurface`].
pub struct SkyDrawer<T: ToneMapper = ToneReproducer> {
    eye: T,
    adaptation: AdaptationState,
    model: PhotometricModel,
    colors: Arc<ColorTable>,
    rng: ChaCha8Rng,

    twinkle_amount: f32,
    flag_twinkle: bool,
    flag_point_star: bool,
    flag_luminance_adaptation: bool,
    max_adapt_fov: f32,
    min_adapt_fov: f32,
    relative_scale: f32,
    absolute_scale: f32,
    star_linear_scale: f32,
    input_scale: f32,
    adaptation_time_constant_s: f32,
    bortle_scale: i32,
    bortle_limit_magnitudes: [f32; 9],

    /// Field of view given to the last update, before clamping.
    current_fov: f32,
    limit_magnitude: f32,
    limit_luminance: f32,

    halos: PointSourceBatch,
    big_halos: PointSourceBatch,
    session: Session,
}

impl SkyDrawer<ToneReproducer> {
    /// Create a drawer with the bundled tone reproducer.
    pub fn new(settings: SkyDrawerSettings) -> Self {
        let eye = ToneReproducer::new(settings.world_luminance_floor);
        Self::with_tone_mapper(settings, eye)
    }

    /// Create a drawer from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(SkyDrawerSettings::from(config))
    }
}

impl<T: ToneMapper> SkyDrawer<T> {
    /// Create a drawer around a caller-supplied tone mapper.
    ///
    /// Calibrates the input scale for the configured Bortle class and computes
    /// the limits at the reference field of view, so getters are meaningful
    /// before the first [`update`](Self::update).
    pub fn with_tone_mapper(settings: SkyDrawerSettings, eye: T) -> Self {
        let colors = match ColorTable::from_samples(&settings.bv_colors) {
            Ok(table) => table,
            Err(e) => {
                log::warn!("Invalid B-V color samples ({e}), using built-in colors");
                ColorTable::builtin().clone()
            }
        };

        let mut drawer = Self {
            eye,
            adaptation: AdaptationState::new(settings.world_luminance_floor),
            model: PhotometricModel::default(),
            colors: Arc::new(colors),
            rng: ChaCha8Rng::seed_from_u64(settings.twinkle_seed),
            twinkle_amount: settings.twinkle_amount.clamp(0.0, 1.0),
            flag_twinkle: settings.flag_twinkle,
            flag_point_star: settings.flag_point_star,
            flag_luminance_adaptation: settings.luminance_adaptation,
            max_adapt_fov: settings.max_adapt_fov.max(REFERENCE_FOV),
            min_adapt_fov: settings.min_adapt_fov.min(REFERENCE_FOV),
            relative_scale: settings.relative_scale,
            absolute_scale: settings.absolute_scale,
            star_linear_scale: 1.0,
            input_scale: 1.0,
            adaptation_time_constant_s: settings.adaptation_time_constant_s,
            bortle_scale: BORTLE_MIN,
            bortle_limit_magnitudes: settings.bortle_limit_magnitudes,
            current_fov: REFERENCE_FOV,
            limit_magnitude: MAGNITUDE_SEARCH.lower,
            limit_luminance: 0.0,
            halos: PointSourceBatch::new(),
            big_halos: PointSourceBatch::new(),
            session: Session::Idle,
        };
        drawer.update_linear_scale();
        drawer.set_bortle_scale(settings.bortle_scale);
        drawer
    }

    // -- Frame cycle ---------------------------------------------------------

    /// Advance eye adaptation by `delta_time` seconds and rebuild the
    /// photometric model for `fov_deg`.
    ///
    /// Must run once per frame before any size computation or draw.
    pub fn update(&mut self, delta_time: f64, fov_deg: f32) {
        if self.flag_luminance_adaptation {
            self.adaptation
                .resolve(delta_time, self.adaptation_time_constant_s);
        } else {
            self.adaptation.reset_to_floor();
        }

        self.current_fov = fov_deg;
        let fov = fov_deg.clamp(self.min_adapt_fov, self.max_adapt_fov);
        self.model = PhotometricModel::for_fov(fov);
        self.apply_eye_state();
        self.refresh_limits();
    }

    /// Re-apply this frame's adaptation to the tone mapper before drawing.
    pub fn pre_draw(&mut self) {
        self.apply_eye_state();
    }

    /// Report a luminance (cd/m^2) present in the view this frame.
    ///
    /// The brightest report of the frame drives the next update. Fast
    /// adaptation only applies when the view gets brighter.
    pub fn report_luminance_in_fov(&mut self, lum: f32, fast_adaptation: bool) {
        if self.flag_luminance_adaptation {
            self.adaptation.report(lum, fast_adaptation);
        }
    }

    fn apply_eye_state(&mut self) {
        self.eye
            .set_world_adaptation_luminance(self.adaptation.world_luminance());
        self.eye
            .set_input_scale(self.input_scale * self.model.power_factor());
    }

    // -- Sizing --------------------------------------------------------------

    /// Halo radius before any shaping, for a point source of log luminance
    /// `ln_lum` under the current tone mapper.
    fn raw_radius(&self, ln_lum: f32) -> f32 {
        star_radius(&self.eye, ln_lum, self.relative_scale, self.star_linear_scale)
    }

    fn is_visible(&self, mag: f32) -> bool {
        self.raw_radius(self.model.magnitude_to_ln_luminance(mag)) >= MIN_VISIBLE_RADIUS
    }

    /// Radius and intensity of a point source of magnitude `mag`, with twinkle.
    ///
    /// Returns `None` when the source is fainter than the limiting magnitude.
    pub fn compute_rc_mag(&mut self, mag: f32) -> Option<RcMag> {
        let mut rc = self.compute_rc_mag_steady(mag)?;
        if self.flag_twinkle && self.current_fov < self.max_adapt_fov {
            let jitter: f32 = self.rng.random();
            rc.luminance *= 1.0 - self.twinkle_amount * jitter;
        }
        Some(rc)
    }

    /// Radius and intensity of a point source of magnitude `mag`, without
    /// twinkle.
    pub fn compute_rc_mag_steady(&self, mag: f32) -> Option<RcMag> {
        let ln_lum = self.model.magnitude_to_ln_luminance(mag);
        if ln_lum < self.model.magnitude_to_ln_luminance(self.limit_magnitude) {
            return None;
        }

        let raw = self.raw_radius(ln_lum);
        if raw < MIN_VISIBLE_RADIUS {
            return None;
        }

        if self.flag_point_star {
            let ratio = raw / MIN_HALO_RADIUS;
            return Some(RcMag {
                radius: POINT_STAR_RADIUS,
                luminance: (ratio * ratio * ratio).min(1.0),
            });
        }

        if raw < MIN_HALO_RADIUS {
            return Some(RcMag {
                radius: MIN_HALO_RADIUS,
                luminance: raw * raw * raw / (MIN_HALO_RADIUS * MIN_HALO_RADIUS * MIN_HALO_RADIUS),
            });
        }

        let mut radius = raw;
        if radius > SOFT_RADIUS_LIMIT {
            radius = SOFT_RADIUS_LIMIT + (1.0 + radius - SOFT_RADIUS_LIMIT).sqrt() - 1.0;
        }
        Some(RcMag {
            radius: radius.min(MAX_HALO_RADIUS),
            luminance: 1.0,
        })
    }

    // -- Limits --------------------------------------------------------------

    fn refresh_limits(&mut self) {
        self.limit_magnitude = MAGNITUDE_SEARCH.search(|mag| self.is_visible(mag)).last_true;
        let eye = &self.eye;
        let log_lum = LOG_LUMINANCE_SEARCH
            .search(|x| eye.adapt_luminance_scaled(10f32.powf(x)) < EXTENDED_VISIBILITY_THRESHOLD)
            .first_false;
        self.limit_luminance = 10f32.powf(log_lum);
        log::debug!(
            "Sky limits at fov {:.2}: magnitude {:.2}, luminance {:.3e} cd/m^2",
            self.model.fov(),
            self.limit_magnitude,
            self.limit_luminance
        );
    }

    /// Faintest visible point source magnitude for the current frame.
    pub fn limit_magnitude(&self) -> f32 {
        self.limit_magnitude
    }

    /// Faintest visible extended object luminance (cd/m^2) for the current frame.
    pub fn limit_luminance(&self) -> f32 {
        self.limit_luminance
    }

    /// World adaptation luminance (cd/m^2) at which a point source of
    /// magnitude `mag` gets a halo of `target_radius` pixels.
    ///
    /// Uses the current photometric model and input scale. Returns `None` when
    /// no adaptation between 1e-4 and 1e8 cd/m^2 makes the halo that large.
    /// The eye is left adapted to the current world luminance.
    pub fn find_world_luminance_for_magnitude(
        &mut self,
        mag: f32,
        target_radius: f32,
    ) -> Option<f32> {
        if target_radius.is_nan() || target_radius <= 0.0 {
            return None;
        }
        let ln_lum = self.model.magnitude_to_ln_luminance(mag);
        let (relative, linear) = (self.relative_scale, self.star_linear_scale);
        let eye = &mut self.eye;

        // Halos shrink as the eye adapts to brighter surroundings.
        let mut reaches_target = |log_lum: f32| {
            eye.set_world_adaptation_luminance(10f32.powf(log_lum));
            star_radius(eye, ln_lum, relative, linear) >= target_radius
        };
        let found = if reaches_target(LOG_WORLD_LUMINANCE_SEARCH.lower) {
            let bracket = LOG_WORLD_LUMINANCE_SEARCH.search(&mut reaches_target);
            Some(10f32.powf(bracket.last_true))
        } else {
            None
        };

        self.apply_eye_state();
        found
    }

    // -- Bortle scale --------------------------------------------------------

    /// Set the light pollution class, 1 (darkest) to 9 (inner city).
    ///
    /// Calibrates the input scale so that, at the reference field of view and
    /// the default world luminance, the class's limiting magnitude is exactly
    /// at the visibility threshold.
    pub fn set_bortle_scale(&mut self, index: i32) {
        let clamped = index.clamp(BORTLE_MIN, BORTLE_MAX);
        if clamped != index {
            log::warn!("Bortle scale {index} out of range, using {clamped}");
        }
        self.bortle_scale = clamped;
        let target_mag = self.bortle_limit_magnitudes[(clamped - BORTLE_MIN) as usize];
        self.input_scale = self.calibrate_input_scale(target_mag);
        log::info!(
            "Bortle scale {clamped}: limiting magnitude {target_mag:.1}, input scale {:.4}",
            self.input_scale
        );
        self.apply_eye_state();
        self.refresh_limits();
    }

    /// Input scale that puts `target_mag` on the visibility threshold.
    fn calibrate_input_scale(&mut self, target_mag: f32) -> f32 {
        let reference = PhotometricModel::default();
        let ln_lum = reference.magnitude_to_ln_luminance(target_mag);
        let (relative, linear) = (self.relative_scale, self.star_linear_scale);
        let eye = &mut self.eye;
        eye.set_world_adaptation_luminance(self.adaptation.floor());

        let ln_scale = LN_INPUT_SCALE_SEARCH
            .search(|ln_scale| {
                eye.set_input_scale(ln_scale.exp());
                star_radius(eye, ln_lum, relative, linear) < MIN_VISIBLE_RADIUS
            })
            .first_false;
        ln_scale.exp()
    }

    /// Current light pollution class.
    pub fn bortle_scale(&self) -> i32 {
        self.bortle_scale
    }

    // -- Draw sessions -------------------------------------------------------

    /// Open a point source session.
    pub fn pre_draw_point_source(&mut self) -> Result<(), SkyDrawerError> {
        if self.session != Session::Idle {
            return Err(SkyDrawerError::SessionActive);
        }
        self.halos.clear();
        self.big_halos.clear();
        self.session = Session::Active;
        Ok(())
    }

    /// Queue a point source at sky `direction`.
    ///
    /// Returns `Ok(false)` when nothing was queued: zero radius, projection
    /// failed, or the session was aborted earlier.
    pub fn draw_point_source<S: SkySurface + ?Sized>(
        &mut self,
        surface: &S,
        direction: DVec3,
        rc: RcMag,
        color: [f32; 3],
        check_in_screen: bool,
    ) -> Result<bool, SkyDrawerError> {
        match self.session {
            Session::Idle => return Err(SkyDrawerError::NoSession),
            Session::Aborted => return Ok(false),
            Session::Active => {}
        }
        if rc.radius <= 0.0 {
            return Ok(false);
        }

        let projector = surface.projector();
        let projected = if check_in_screen {
            projector.project_check(direction)
        } else {
            projector.project(direction)
        };
        let Some(position) = projected else {
            return Ok(false);
        };

        if let Err(e) = self.queue_halos(PointSourceEntry {
            position,
            radius: rc.radius,
            luminance: rc.luminance,
            color,
        }) {
            log::warn!("Dropping point source session: {e}");
            self.abort_session();
            return Err(e);
        }
        Ok(true)
    }

    /// Drop everything queued so far. Later draws in the session are ignored
    /// and the closing flush submits nothing.
    fn abort_session(&mut self) {
        self.halos.clear();
        self.big_halos.clear();
        self.session = Session::Aborted;
    }

    fn queue_halos(&mut self, entry: PointSourceEntry) -> Result<(), SkyDrawerError> {
        self.halos.push(entry)?;
        if entry.radius > BIG_HALO_THRESHOLD {
            let fade = (entry.radius - BIG_HALO_THRESHOLD) / BIG_HALO_FADE_SPAN;
            self.big_halos.push(PointSourceEntry {
                radius: BIG_HALO_RADIUS,
                luminance: entry.luminance.min(fade).min(1.0),
                ..entry
            })?;
        }
        Ok(())
    }

    /// Queue a point source colored by its quantized B-V index.
    pub fn draw_point_source_bv<S: SkySurface + ?Sized>(
        &mut self,
        surface: &S,
        direction: DVec3,
        rc: RcMag,
        bv_index: u8,
        check_in_screen: bool,
    ) -> Result<bool, SkyDrawerError> {
        let color = self.colors.index_to_color(bv_index);
        self.draw_point_source(surface, direction, rc, color, check_in_screen)
    }

    /// Flush the session's halos to `surface` and close the session.
    ///
    /// Returns the number of point sources flushed.
    pub fn post_draw_point_source<S: SkySurface + ?Sized>(
        &mut self,
        surface: &mut S,
    ) -> Result<usize, SkyDrawerError> {
        match self.session {
            Session::Idle => return Err(SkyDrawerError::NoSession),
            Session::Aborted => {
                self.session = Session::Idle;
                return Ok(0);
            }
            Session::Active => {}
        }

        let count = self.halos.len();
        if !self.halos.is_empty() {
            let kind = if self.flag_point_star {
                SpriteKind::Point
            } else {
                SpriteKind::Halo
            };
            surface.submit_point_sources(kind, &self.halos);
        }
        if !self.big_halos.is_empty() {
            surface.submit_point_sources(SpriteKind::BigHalo, &self.big_halos);
        }
        self.halos.clear();
        self.big_halos.clear();
        self.session = Session::Idle;
        Ok(count)
    }

    /// Draw the halo of a body whose disk may be resolved, such as a planet.
    ///
    /// `illuminated_area` is the lit disk area in arcmin^2. The halo fades out
    /// as the disk grows so a rendered 3-D model takes over. Bodies brighter
    /// than magnitude -15 get the Sun glare sprite instead. With adaptation
    /// on, the halo's equivalent world luminance is reported for the next
    /// update. Returns whether anything was drawn.
    pub fn post_draw_sky_3d_model<S: SkySurface + ?Sized>(
        &mut self,
        surface: &mut S,
        direction: DVec3,
        illuminated_area: f32,
        mag: f32,
        color: [f32; 3],
    ) -> Result<bool, SkyDrawerError> {
        if self.session != Session::Idle {
            return Err(SkyDrawerError::SessionActive);
        }

        let projector = surface.projector();
        let Some(position) = projector.project(direction) else {
            return Ok(false);
        };
        let pix_per_arcmin = projector.pixels_per_radian() * PI / 180.0 / 60.0;
        let pix_radius = (illuminated_area * pix_per_arcmin * pix_per_arcmin / PI).sqrt();

        if mag < SUN_MAGNITUDE {
            let sun_radius = SUN_HALO_RADIUS_SCALE * (SUN_MAGNITUDE - mag);
            let fade_edge = 3.0 * pix_radius + SUN_HALO_FADE_MARGIN;
            let intensity = if sun_radius < fade_edge {
                (1.0 - (fade_edge - sun_radius) / SUN_HALO_FADE_MARGIN).max(0.0)
            } else {
                1.0
            };
            if intensity <= 0.0 {
                return Ok(false);
            }
            surface.draw_sprite(
                SpriteKind::SunHalo,
                position,
                sun_radius,
                color.map(|c| c * intensity),
            );
            return Ok(true);
        }

        let Some(mut rc) = self.compute_rc_mag_steady(mag) else {
            return Ok(false);
        };

        if self.flag_luminance_adaptation
            && let Some(world_lum) = self.find_world_luminance_for_magnitude(mag, rc.radius)
        {
            let fov = self.current_fov.max(f32::EPSILON);
            let fov_cap = SKY_3D_MODEL_FOV_LUMINANCE * (REFERENCE_FOV / fov).powi(2);
            let reported = (world_lum / SKY_3D_MODEL_LUMINANCE_DIVISOR)
                .min(fov_cap)
                .min(SKY_3D_MODEL_MAX_LUMINANCE);
            self.report_luminance_in_fov(reported, false);
        }

        let max_radius = (3.0 * pix_radius).max(DISK_FADE_STOP);
        if rc.radius > max_radius {
            rc.radius = max_radius + (rc.radius - max_radius).sqrt();
        }
        if pix_radius >= DISK_FADE_STOP {
            rc.luminance = 0.0;
        } else if pix_radius > DISK_FADE_START {
            rc.luminance *= (DISK_FADE_STOP - pix_radius) / (DISK_FADE_STOP - DISK_FADE_START);
        }
        if rc.luminance <= 0.0 {
            return Ok(false);
        }

        self.pre_draw_point_source()?;
        let drawn = self.draw_point_source(&*surface, direction, rc, color, false);
        let flushed = self.post_draw_point_source(surface);
        let drawn = drawn?;
        flushed?;
        Ok(drawn)
    }

    // -- Colors and photometry -----------------------------------------------

    /// RGB color for a quantized B-V index.
    pub fn index_to_color(&self, bv_index: u8) -> [f32; 3] {
        self.colors.index_to_color(bv_index)
    }

    /// B-V value of a quantized B-V index.
    pub fn index_to_bv(bv_index: u8) -> f32 {
        color::index_to_bv(bv_index)
    }

    /// The shared color table.
    pub fn color_table(&self) -> &Arc<ColorTable> {
        &self.colors
    }

    /// Luminance (cd/m^2) of a surface brightness in mag/arcmin^2.
    pub fn surface_brightness_to_luminance(sb: f32) -> f32 {
        photometry::surface_brightness_to_luminance(sb)
    }

    /// Surface brightness in mag/arcmin^2 of a luminance in cd/m^2.
    pub fn luminance_to_surface_brightness(lum: f32) -> f32 {
        photometry::luminance_to_surface_brightness(lum)
    }

    /// Photometric model for the current frame.
    pub fn photometric_model(&self) -> &PhotometricModel {
        &self.model
    }

    // -- Tone mapper ---------------------------------------------------------

    pub fn eye(&self) -> &T {
        &self.eye
    }

    pub fn eye_mut(&mut self) -> &mut T {
        &mut self.eye
    }

    /// World luminance (cd/m^2) the eye is adapted to.
    pub fn world_luminance(&self) -> f32 {
        self.adaptation.world_luminance()
    }

    // -- Parameters ----------------------------------------------------------

    pub fn twinkle_amount(&self) -> f32 {
        self.twinkle_amount
    }

    /// Set the twinkle strength, clamped to `[0, 1]`.
    pub fn set_twinkle_amount(&mut self, amount: f32) {
        self.twinkle_amount = amount.clamp(0.0, 1.0);
    }

    pub fn flag_twinkle(&self) -> bool {
        self.flag_twinkle
    }

    pub fn set_flag_twinkle(&mut self, enabled: bool) {
        self.flag_twinkle = enabled;
    }

    pub fn flag_point_star(&self) -> bool {
        self.flag_point_star
    }

    pub fn set_flag_point_star(&mut self, enabled: bool) {
        self.flag_point_star = enabled;
    }

    pub fn flag_luminance_adaptation(&self) -> bool {
        self.flag_luminance_adaptation
    }

    /// Toggle eye adaptation. Disabling pins the world luminance to the floor
    /// immediately, eye and limits included.
    pub fn set_flag_luminance_adaptation(&mut self, enabled: bool) {
        self.flag_luminance_adaptation = enabled;
        if !enabled {
            self.adaptation.reset_to_floor();
            self.apply_eye_state();
            self.refresh_limits();
        }
    }

    pub fn max_adapt_fov(&self) -> f32 {
        self.max_adapt_fov
    }

    /// Set the widest FOV adaptation follows. Never below 60 degrees.
    pub fn set_max_adapt_fov(&mut self, fov_deg: f32) {
        self.max_adapt_fov = fov_deg.max(REFERENCE_FOV);
    }

    pub fn min_adapt_fov(&self) -> f32 {
        self.min_adapt_fov
    }

    /// Set the narrowest FOV adaptation follows. Never above 60 degrees.
    pub fn set_min_adapt_fov(&mut self, fov_deg: f32) {
        self.min_adapt_fov = fov_deg.min(REFERENCE_FOV);
    }

    pub fn relative_scale(&self) -> f32 {
        self.relative_scale
    }

    /// Set how quickly halos grow with brightness.
    pub fn set_relative_scale(&mut self, scale: f32) {
        self.relative_scale = scale;
        self.update_linear_scale();
        self.refresh_limits();
    }

    pub fn absolute_scale(&self) -> f32 {
        self.absolute_scale
    }

    /// Set the overall halo size.
    pub fn set_absolute_scale(&mut self, scale: f32) {
        self.absolute_scale = scale;
        self.update_linear_scale();
        self.refresh_limits();
    }

    /// Multiplier from tone mapped luminance to halo radius.
    pub fn star_linear_scale(&self) -> f32 {
        self.star_linear_scale
    }

    fn update_linear_scale(&mut self) {
        self.star_linear_scale = (LINEAR_SCALE_BASE * self.absolute_scale)
            .powf(LINEAR_SCALE_EXPONENT * self.relative_scale);
    }

    /// Input scale before the FOV power factor is applied.
    pub fn input_scale(&self) -> f32 {
        self.input_scale
    }

    /// Override the calibrated input scale. Applies from the next update.
    pub fn set_input_scale(&mut self, scale: f32) {
        self.input_scale = scale;
    }

    pub fn adaptation_time_constant(&self) -> f32 {
        self.adaptation_time_constant_s
    }

    pub fn set_adaptation_time_constant(&mut self, seconds: f32) {
        self.adaptation_time_constant_s = seconds;
    }

    pub fn world_luminance_floor(&self) -> f32 {
        self.adaptation.floor()
    }

    /// Change the default world luminance in cd/m^2.
    ///
    /// Non-finite values are ignored and the floor is kept at or above
    /// [`MIN_WORLD_LUMINANCE`](crate::tone::MIN_WORLD_LUMINANCE). A floor
    /// above the current world luminance raises it right away.
    pub fn set_world_luminance_floor(&mut self, lum: f32) {
        let floor = self.adaptation.set_floor(lum);
        if floor != lum {
            log::warn!("World luminance floor {lum} rejected, using {floor}");
        }
        self.apply_eye_state();
        self.refresh_limits();
    }

    /// Field of view given to the last update, before clamping.
    pub fn current_fov(&self) -> f32 {
        self.current_fov
    }
}

/// Unshaped halo radius of a point source of log luminance `ln_lum`.
fn star_radius<T: ToneMapper>(eye: &T, ln_lum: f32, relative_scale: f32, linear_scale: f32) -> f32 {
    eye.adapt_luminance_scaled_ln(ln_lum, STAR_LUMINANCE_EXPONENT * relative_scale) * linear_scale
}

#[cfg(test)]
#[path = "drawer_tests.rs"]
mod tests;
