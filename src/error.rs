//! Error taxonomy for the plot pipeline.
//!
//! Everything that aborts a `render` is a variant here; ambiguous type
//! inference is deliberately not an error (it is logged and resolution
//! proceeds with the documented tie-break).

use thiserror::Error;

/// Errors raised by the external rendering engine while executing a
/// directive sequence. The engine is opaque to this crate, so the payload
/// is just its message.
#[derive(Error, Debug)]
#[error("renderer failed: {0}")]
pub struct RenderError(pub String);

/// Library-wide error type.
#[derive(Error, Debug)]
pub enum PlotError {
    /// Caller misuse: `true` with no default, mixed prefixed/plain keys,
    /// styling before any data layer, patching a directive of the wrong
    /// type, and similar contract breaches.
    #[error("contract violation: {0}")]
    Contract(String),

    /// A preset name did not resolve to a single well-formed entry.
    #[error("preset error: {0}")]
    Preset(String),

    /// The external renderer raised; propagated unchanged after the full
    /// directive list has been logged.
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, PlotError>;

impl PlotError {
    pub(crate) fn contract(msg: impl Into<String>) -> Self {
        PlotError::Contract(msg.into())
    }

    pub(crate) fn preset(msg: impl Into<String>) -> Self {
        PlotError::Preset(msg.into())
    }
}
