//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted sky configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "sky.ron";

/// Top-level sky renderer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Point source sizing, twinkle, and light pollution settings.
    pub stars: StarsConfig,
    /// Eye adaptation settings.
    pub viewing: ViewingConfig,
    /// B-V color samples used to build the 128-entry color table.
    pub colors: ColorConfig,
    /// Output viewport used by headless runs.
    pub viewport: ViewportConfig,
    /// Procedural catalog used by the demo.
    pub catalog: CatalogConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Point source rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StarsConfig {
    /// Strength of the twinkle jitter, in `[0, 1]`.
    pub twinkle_amount: f32,
    /// Enable twinkling.
    pub flag_twinkle: bool,
    /// Draw point sources as single points instead of halo sprites.
    pub flag_point_star: bool,
    /// How much bigger bright stars look compared to faint ones.
    pub relative_scale: f32,
    /// Absolute halo size/brightness multiplier.
    pub absolute_scale: f32,
    /// Above this FOV (degrees) stars stop getting fainter. Must be >= 60.
    pub max_adapt_fov: f32,
    /// Below this FOV (degrees) stars stop getting brighter. Must be <= 60.
    pub min_adapt_fov: f32,
    /// Bortle light pollution index applied at startup (1-9).
    pub init_bortle_scale: i32,
    /// Limiting magnitude at 60 degrees FOV for each Bortle index 1..=9.
    pub bortle_limit_magnitudes: [f32; 9],
    /// Seed for the twinkle jitter generator.
    pub twinkle_seed: u64,
}

/// Eye adaptation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewingConfig {
    /// Follow reported luminances. When off, the floor luminance is used.
    pub luminance_adaptation: bool,
    /// World luminance (cd/m^2) of a dark sky with nothing bright in view.
    pub world_luminance_floor: f32,
    /// Time constant of the slow adaptation blend, in seconds.
    pub adaptation_time_constant_s: f32,
}

/// A single B-V to RGB sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BvColor {
    /// B-V color index.
    pub bv: f32,
    /// Linear RGB color.
    pub rgb: [f32; 3],
}

/// Star color configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColorConfig {
    /// Samples interpolated into the color table. Needs at least two entries.
    pub bv_colors: Vec<BvColor>,
}

/// Viewport configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewportConfig {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
}

/// Procedural catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Number of generated stars.
    pub star_count: u32,
    /// Generator seed.
    pub seed: u64,
    /// Faintest generated V magnitude.
    pub faintest_magnitude: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Write a JSON log file next to the config in debug builds.
    pub log_to_file: bool,
}

// --- Default implementations ---

impl Default for StarsConfig {
    fn default() -> Self {
        Self {
            twinkle_amount: 0.3,
            flag_twinkle: true,
            flag_point_star: false,
            relative_scale: 1.0,
            absolute_scale: 1.0,
            max_adapt_fov: 70.0,
            min_adapt_fov: 0.1,
            init_bortle_scale: 3,
            bortle_limit_magnitudes: [7.8, 7.3, 6.8, 6.3, 5.8, 5.3, 4.8, 4.4, 4.0],
            twinkle_seed: 0x5eed,
        }
    }
}

impl Default for ViewingConfig {
    fn default() -> Self {
        Self {
            luminance_adaptation: true,
            world_luminance_floor: 0.1,
            adaptation_time_constant_s: 1.0,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        let samples: [(f32, [f32; 3]); 12] = [
            (-0.4, [0.61, 0.71, 1.00]),
            (-0.2, [0.69, 0.77, 1.00]),
            (0.0, [0.80, 0.85, 1.00]),
            (0.2, [0.91, 0.92, 1.00]),
            (0.4, [1.00, 0.98, 0.96]),
            (0.6, [1.00, 0.93, 0.84]),
            (0.8, [1.00, 0.88, 0.73]),
            (1.0, [1.00, 0.84, 0.64]),
            (1.2, [1.00, 0.80, 0.56]),
            (1.4, [1.00, 0.76, 0.48]),
            (1.6, [1.00, 0.72, 0.40]),
            (2.0, [1.00, 0.65, 0.28]),
        ];
        Self {
            bv_colors: samples
                .iter()
                .map(|&(bv, rgb)| BvColor { bv, rgb })
                .collect(),
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fov_deg: 60.0,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            star_count: 5000,
            seed: 42,
            faintest_magnitude: 9.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: false,
        }
    }
}

// --- Validation ---

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl Config {
    /// Reject values the drawer cannot clamp into something meaningful.
    ///
    /// Out-of-range indices and amounts (Bortle index, twinkle amount, adapt
    /// FOV bounds) are clamped by the drawer and are accepted here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let floor = self.viewing.world_luminance_floor;
        if !(floor.is_finite() && floor > 0.0) {
            return Err(invalid(
                "viewing.world_luminance_floor",
                format!("must be a positive luminance, got {floor}"),
            ));
        }
        if self.viewing.adaptation_time_constant_s < 0.0 {
            return Err(invalid(
                "viewing.adaptation_time_constant_s",
                "must not be negative",
            ));
        }
        if let Some(pair) = self
            .stars
            .bortle_limit_magnitudes
            .windows(2)
            .find(|pair| pair[0] <= pair[1])
        {
            return Err(invalid(
                "stars.bortle_limit_magnitudes",
                format!("must decrease with light pollution, found {} then {}", pair[0], pair[1]),
            ));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(invalid("viewport", "width and height must be non-zero"));
        }
        let fov = self.viewport.fov_deg;
        if !(fov > 0.0 && fov < 180.0) {
            return Err(invalid("viewport.fov_deg", format!("must be in (0, 180), got {fov}")));
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded sky config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default sky config at {}", config_path.display());
            Ok(config)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = ron::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the given directory as `sky.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let write_err = |source| ConfigError::Write {
            path: config_path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_err)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(false)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty)?;

        std::fs::write(&config_path, serialized).map_err(write_err)?;
        Ok(())
    }

    /// Re-read `sky.ron`. Returns `Some(new_config)` if it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE_NAME))?;

        if &new_config != self {
            log::info!("Sky config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
