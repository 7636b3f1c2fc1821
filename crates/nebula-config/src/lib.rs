//! Configuration system for the Nebula sky renderer.
//!
//! Star rendering, eye adaptation, and color settings persist to disk as a RON
//! file. Supports CLI overrides via clap, hot-reload detection, and
//! forward/backward compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    BvColor, CONFIG_FILE_NAME, CatalogConfig, ColorConfig, Config, DebugConfig, StarsConfig,
    ViewingConfig, ViewportConfig,
};
pub use error::ConfigError;
