//! Headless sky drawer demo.
//!
//! Generates a procedural star catalog and runs the full per-frame cycle
//! (adaptation update, halo sizing, batched point source draws) while the view
//! pans and zooms. Halo batches are expanded into GPU vertices and counted
//! instead of rasterized.
//!
//! Configuration is loaded from `sky.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p nebula-sky-demo -- --bortle 1 --frames 240`.

mod catalog;

use catalog::{CatalogGenerator, CatalogStar};
use clap::Parser;
use glam::{DVec3, Vec2};
use nebula_config::{CliArgs, Config};
use nebula_sky::{
    HaloVertex, PointSourceBatch, Projector, SkyDrawer, SkyProjector, SkySurface, SpriteKind,
};
use tracing::{debug, info, warn};

const DEFAULT_FRAMES: u32 = 120;
const FRAME_TIME_S: f64 = 1.0 / 60.0;

/// Narrowest field of view reached by the zoom.
const ZOOM_TARGET_FOV: f32 = 2.0;

/// Moon-like body drawn through the resolved-disk path.
const MOON_MAGNITUDE: f32 = -12.7;
const MOON_AREA_ARCMIN2: f32 = std::f32::consts::PI * 15.5 * 15.5;
const MOON_LUMINANCE: f32 = 2500.0;

/// Surface that expands batches into vertices and keeps per-frame counters.
struct StatsSurface {
    projector: SkyProjector,
    vertices: Vec<HaloVertex>,
    halos: usize,
    big_halos: usize,
    sprites: usize,
}

impl StatsSurface {
    fn new(config: &Config) -> Self {
        let viewport = &config.viewport;
        Self {
            projector: SkyProjector::new(viewport.width, viewport.height, viewport.fov_deg),
            vertices: Vec::new(),
            halos: 0,
            big_halos: 0,
            sprites: 0,
        }
    }

    fn begin_frame(&mut self) {
        self.vertices.clear();
        self.halos = 0;
        self.big_halos = 0;
        self.sprites = 0;
    }
}

impl SkySurface for StatsSurface {
    fn projector(&self) -> &dyn Projector {
        &self.projector
    }

    fn submit_point_sources(&mut self, kind: SpriteKind, batch: &PointSourceBatch) {
        match kind {
            SpriteKind::BigHalo => self.big_halos += batch.len(),
            _ => self.halos += batch.len(),
        }
        batch.write_vertices(&mut self.vertices);
    }

    fn draw_sprite(&mut self, kind: SpriteKind, center: Vec2, radius: f32, _rgb: [f32; 3]) {
        debug!("Sprite {kind:?} at ({:.0}, {:.0}) radius {radius:.1}", center.x, center.y);
        self.sprites += 1;
    }
}

/// Field of view for `frame`: hold, then zoom exponentially toward the target.
fn fov_at(frame: u32, frames: u32, start_fov: f32) -> f32 {
    let t = (frame as f32 / frames.max(1) as f32 - 0.5).max(0.0) * 2.0;
    start_fov * (ZOOM_TARGET_FOV / start_fov).powf(t)
}

/// Apply CLI overrides and validate the result, falling back to defaults when
/// the combination is unusable.
fn resolve_config(mut config: Config, args: &CliArgs) -> Config {
    config.apply_cli_overrides(args);
    match config.validate() {
        Ok(()) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}, using defaults");
            let mut fallback = Config::default();
            fallback.debug = config.debug;
            fallback
        }
    }
}

/// Draw every visible catalog star in one session. Returns the number queued.
fn draw_stars(
    drawer: &mut SkyDrawer,
    surface: &mut StatsSurface,
    stars: &[CatalogStar],
) -> Result<usize, nebula_sky::SkyDrawerError> {
    drawer.pre_draw_point_source()?;
    for star in stars {
        // Sorted brightest first: everything after the first miss is fainter.
        let Some(rc) = drawer.compute_rc_mag(star.magnitude) else {
            break;
        };
        drawer.draw_point_source_bv(&*surface, star.direction, rc, star.bv_index, true)?;
    }
    drawer.post_draw_point_source(surface)
}

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join("nebula-sky")
    });

    let loaded = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    let config = resolve_config(loaded, &args);

    let log_dir = config_dir.join("logs");
    nebula_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let frames = args.frames.unwrap_or(DEFAULT_FRAMES);
    let catalog = CatalogGenerator::new(
        config.catalog.seed,
        config.catalog.star_count,
        config.catalog.faintest_magnitude,
    )
    .generate();
    info!(
        "Generated {} catalog stars down to magnitude {:.1}",
        catalog.len(),
        config.catalog.faintest_magnitude
    );

    let mut drawer = SkyDrawer::from_config(&config);
    let mut surface = StatsSurface::new(&config);
    info!(
        "Sky drawer ready: Bortle {}, limit magnitude {:.2}",
        drawer.bortle_scale(),
        drawer.limit_magnitude()
    );

    let moon = DVec3::new(0.3, 0.1, -1.0).normalize();
    let start_fov = config.viewport.fov_deg;

    for frame in 0..frames {
        let fov = fov_at(frame, frames, start_fov);
        let pan = frame as f64 * 0.002;
        surface.projector.look_at(DVec3::new(pan.sin(), 0.05, -pan.cos()));
        surface.projector.set_fov(fov);
        surface.begin_frame();

        drawer.update(FRAME_TIME_S, fov);
        drawer.pre_draw();

        let queued = match draw_stars(&mut drawer, &mut surface, &catalog) {
            Ok(queued) => queued,
            Err(e) => {
                warn!("Frame {frame}: star pass failed: {e}");
                0
            }
        };

        match drawer.post_draw_sky_3d_model(
            &mut surface,
            moon,
            MOON_AREA_ARCMIN2,
            MOON_MAGNITUDE,
            [1.0, 0.97, 0.9],
        ) {
            Ok(_) => {}
            Err(e) => warn!("Frame {frame}: moon halo failed: {e}"),
        }
        if surface.projector.project_check(moon).is_some() {
            drawer.report_luminance_in_fov(MOON_LUMINANCE, false);
        }

        info!(
            "Frame {frame}: fov {fov:.2}, world lum {:.3}, limit mag {:.2}, stars {queued}, big halos {}, sprites {}, vertices {}",
            drawer.world_luminance(),
            drawer.limit_magnitude(),
            surface.big_halos,
            surface.sprites,
            surface.vertices.len()
        );
    }

    info!("Simulated {frames} frames");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fov_holds_then_zooms() {
        assert_eq!(fov_at(0, 100, 60.0), 60.0);
        assert_eq!(fov_at(50, 100, 60.0), 60.0);
        assert!((fov_at(100, 100, 60.0) - ZOOM_TARGET_FOV).abs() < 1e-3);
        assert!(fov_at(75, 100, 60.0) < 60.0);
    }

    #[test]
    fn test_invalid_overrides_fall_back_to_defaults() {
        let args = CliArgs::parse_from(["nebula-sky-demo", "--fov", "0"]);
        let config = resolve_config(Config::default(), &args);
        assert_eq!(config.viewport.fov_deg, Config::default().viewport.fov_deg);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_valid_overrides_are_kept() {
        let args = CliArgs::parse_from(["nebula-sky-demo", "--fov", "30", "--bortle", "5"]);
        let config = resolve_config(Config::default(), &args);
        assert_eq!(config.viewport.fov_deg, 30.0);
        assert_eq!(config.stars.init_bortle_scale, 5);
    }

    #[test]
    fn test_star_pass_flushes_visible_stars() {
        let config = Config::default();
        let catalog = CatalogGenerator::new(11, 500, 9.0).generate();
        let mut drawer = SkyDrawer::from_config(&config);
        let mut surface = StatsSurface::new(&config);
        drawer.update(FRAME_TIME_S, 60.0);

        let queued = draw_stars(&mut drawer, &mut surface, &catalog).unwrap();
        assert_eq!(queued, surface.halos);
        assert_eq!(surface.vertices.len(), 6 * (surface.halos + surface.big_halos));
        assert!(queued < catalog.len(), "faint stars should be culled");
    }
}
