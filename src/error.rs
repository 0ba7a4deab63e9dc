//! The closed set of errors a [`crate::Session`] can return.
//!
//! Every fallible entry point returns [`Result<T>`]; nothing is swallowed
//! and nothing is stringly-typed. `InvalidParameter` carries a short static
//! reason string purely to make failed handshakes debuggable without
//! reaching for a debugger — callers should match on the variant, not the
//! string.

/// Errors produced by the handshake state machine and record layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input: bad container tag, short buffer, bad checksum, a
    /// handshake step invoked in the wrong order, or the identity-lookup
    /// callback reporting failure. Protocol misuse and malformed bytes are
    /// deliberately not distinguished.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// A required allocation could not be satisfied.
    #[error("no memory available")]
    NoMemory,

    /// The caller's output buffer is smaller than the data to be written
    /// into it.
    #[error("buffer too small: need {needed}, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// Signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,

    /// MAC verification failed.
    #[error("invalid mac")]
    InvalidMac,
}

pub type Result<T> = core::result::Result<T, Error>;
