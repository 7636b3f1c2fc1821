//! Command-line argument parsing for the sky renderer.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Sky renderer command-line arguments.
///
/// CLI values override settings loaded from `sky.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "nebula-sky", about = "Nebula sky point source renderer")]
pub struct CliArgs {
    /// Viewport width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Viewport height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Vertical field of view in degrees.
    #[arg(long)]
    pub fov: Option<f32>,

    /// Bortle light pollution index (1-9).
    #[arg(long)]
    pub bortle: Option<i32>,

    /// Twinkle amount in [0, 1].
    #[arg(long)]
    pub twinkle_amount: Option<f32>,

    /// Draw stars as single points.
    #[arg(long)]
    pub point_stars: Option<bool>,

    /// Disable eye adaptation.
    #[arg(long)]
    pub no_adaptation: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of frames to simulate.
    #[arg(long)]
    pub frames: Option<u32>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.viewport.width = w;
        }
        if let Some(h) = args.height {
            self.viewport.height = h;
        }
        if let Some(fov) = args.fov {
            self.viewport.fov_deg = fov;
        }
        if let Some(bortle) = args.bortle {
            self.stars.init_bortle_scale = bortle;
        }
        if let Some(amount) = args.twinkle_amount {
            self.stars.twinkle_amount = amount;
        }
        if let Some(points) = args.point_stars {
            self.stars.flag_point_star = points;
        }
        if args.no_adaptation {
            self.viewing.luminance_adaptation = false;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            fov: Some(5.0),
            bortle: Some(8),
            no_adaptation: true,
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.viewport.fov_deg, 5.0);
        assert_eq!(config.stars.init_bortle_scale, 8);
        assert!(!config.viewing.luminance_adaptation);
        // Non-overridden fields retain defaults
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.stars.twinkle_amount, 0.3);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from([
            "nebula-sky",
            "--bortle",
            "2",
            "--point-stars",
            "true",
            "--frames",
            "10",
        ]);
        assert_eq!(args.bortle, Some(2));
        assert_eq!(args.point_stars, Some(true));
        assert_eq!(args.frames, Some(10));
        assert!(!args.no_adaptation);
    }
}
