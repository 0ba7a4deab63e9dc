//! The capability set a [`crate::Session`] is given at construction time:
//! transport I/O and identity lookup, supplied by the embedding application.

use crate::error::Result;

/// Transport and identity-resolution callbacks a [`crate::Session`] drives
/// the handshake and record layer through. Implementations own the actual
/// socket, queue, or test harness underneath.
pub trait Transport {
    /// Write `buf` to the peer. Must either send the whole buffer or fail;
    /// partial writes are not part of this contract.
    fn send_data(&mut self, buf: &[u8]) -> Result<()>;

    /// Read up to `buf.len()` bytes from the peer into `buf`, returning the
    /// number of bytes actually read.
    fn receive_data(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Resolve `id` to that peer's long-term signing public key, framed as
    /// a [`crate::container`] of tag [`crate::container::EC_PUB_KEY_TAG`].
    /// Returning `Err` aborts the handshake — this is the hook an embedder
    /// uses to reject unknown peers.
    fn get_public_key_for_id(&mut self, id: &[u8]) -> Result<Vec<u8>>;
}
