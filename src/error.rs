//! Error type shared by every operator entry point.

use crate::operator::RunState;
use thiserror::Error;

/// Error type for operator creation, setup and execution.
///
/// Every failure is reported at the point it is detected; nothing is retried internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The capability table passed to `create` was never initialized.
    #[error("pool-rs capabilities are not initialized")]
    Uninitialized,
    /// Malformed static configuration or zero-sized runtime geometry.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Well-formed, but outside the range the numeric path represents losslessly.
    #[error("unsupported parameter: {0}")]
    UnsupportedParameter(String),
    /// An allocation for operator state failed.
    #[error("failed to allocate {bytes} bytes for {what}")]
    OutOfMemory { bytes: usize, what: &'static str },
    /// `run` was called on an operator that has no successful `setup`.
    #[error("operator cannot run in the {0:?} state")]
    InvalidState(RunState),
}

pub type Result<T> = std::result::Result<T, PoolError>;

/// Logs a rejected call and builds the matching error.
macro_rules! fail {
    ($kind:ident, $($arg:tt)+) => {{
        let message = format!($($arg)+);
        log::error!("{}", message);
        $crate::error::PoolError::$kind(message)
    }};
}

pub(crate) use fail;

/// Grows `buffer` to `len` elements filled with `value`, reporting allocation failure instead of
/// aborting. Never shrinks.
pub(crate) fn try_grow<T: Clone>(
    buffer: &mut Vec<T>,
    len: usize,
    value: T,
    what: &'static str,
) -> Result<()> {
    if len > buffer.len() {
        let additional = len - buffer.len();
        buffer.try_reserve_exact(additional).map_err(|_| {
            let bytes = len.saturating_mul(std::mem::size_of::<T>());
            log::error!("failed to allocate {} bytes for {}", bytes, what);
            PoolError::OutOfMemory { bytes, what }
        })?;
        buffer.resize(len, value);
    }
    Ok(())
}
