/// Convenience result type used across gfxpipe.
pub type GfxResult<T> = Result<T, GfxError>;

/// Top-level error taxonomy used by context, surface and pipe APIs.
#[derive(thiserror::Error, Debug)]
pub enum GfxError {
    /// The destination surface became unusable underneath a pipe. Recovered by the context's
    /// revalidate-and-retry path and never surfaced from a drawing verb.
    #[error("invalid pipe: {0}")]
    InvalidPipe(String),

    /// Caller supplied a malformed value (bad hint value, short coordinate array, ...).
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// Operation is not allowed in the current state (e.g. freezing an untrackable object).
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A surface refused a capability such as custom composites.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Invalid configuration values.
    #[error("configuration error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GfxError {
    /// Build a [`GfxError::InvalidPipe`] value.
    pub fn invalid_pipe(msg: impl Into<String>) -> Self {
        Self::InvalidPipe(msg.into())
    }

    /// Build a [`GfxError::IllegalArgument`] value.
    pub fn illegal_argument(msg: impl Into<String>) -> Self {
        Self::IllegalArgument(msg.into())
    }

    /// Build a [`GfxError::IllegalState`] value.
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }

    /// Build a [`GfxError::Permission`] value.
    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    /// Build a [`GfxError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Return `true` for the recoverable invalid-pipe signal.
    pub fn is_invalid_pipe(&self) -> bool {
        matches!(self, Self::InvalidPipe(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
