use thiserror::Error;

use crate::batch::BatchError;

/// Errors raised by [`SkyDrawer`](crate::SkyDrawer) draw sessions.
#[derive(Debug, Error)]
pub enum SkyDrawerError {
    #[error("a point source session is already open")]
    SessionActive,

    #[error("no point source session is open")]
    NoSession,

    #[error(transparent)]
    Batch(#[from] BatchError),
}
