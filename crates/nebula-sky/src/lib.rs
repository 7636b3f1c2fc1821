//! Photometric sky drawing: eye adaptation, magnitude/luminance conversion,
//! star halo sizing, and point source batching.

pub mod adaptation;
pub mod batch;
pub mod color;
pub mod drawer;
pub mod error;
pub mod limit;
pub mod photometry;
pub mod projector;
pub mod surface;
pub mod tone;

pub use adaptation::AdaptationState;
pub use batch::{BatchError, HaloVertex, INITIAL_BATCH_CAPACITY, PointSourceBatch, PointSourceEntry};
pub use color::{COLOR_TABLE_SIZE, ColorTable, ColorTableError, index_to_bv};
pub use drawer::{RcMag, SkyDrawer, SkyDrawerSettings};
pub use error::SkyDrawerError;
pub use limit::{Bracket, Dichotomy};
pub use photometry::{
    PhotometricModel, fov_power_factor, luminance_to_surface_brightness,
    surface_brightness_to_luminance,
};
pub use projector::{Projector, SkyProjector};
pub use surface::{SkySurface, SpriteKind};
pub use tone::{ToneMapper, ToneReproducer};
