//! The crypto facade: a uniform, ordering-sensitive interface to the
//! primitives the handshake and record layer are built from, plus the one
//! concrete backend this crate ships ([`default::DefaultCryptoProvider`]).
//!
//! The facade is expressed as a trait rather than free functions so an
//! alternate primitive backend can be swapped in without touching the
//! handshake state machine or the record layer.

mod default;

pub use default::DefaultCryptoProvider;

use crate::error::Result;

/// Length, in bytes, of the derived `session_id`.
pub const SESSION_ID_LEN: usize = 8;
/// Length, in bytes, of the derived `session_master_key`.
pub const SESSION_MASTER_KEY_LEN: usize = 32;

/// An ephemeral ECDH keypair, held for the lifetime of one handshake.
pub trait EcdhKeypair: Sized {
    /// The framed (tagged, length-prefixed, checksummed) public key bytes,
    /// as sent on the wire.
    fn framed_public_key(&self) -> Vec<u8>;

    /// Perform ECDH against a peer's framed public key, producing the raw
    /// shared secret. Fails with [`crate::Error::InvalidParameter`] if
    /// `peer_framed_public_key` is not validly framed, and rejects
    /// degenerate (all-zero) shared secrets as a potential MITM signal.
    fn derive_shared_secret(&self, peer_framed_public_key: &[u8]) -> Result<Vec<u8>>;
}

/// Uniform access to signature, MAC, KDF, and ECDH operations, plus
/// record-layer sealing. `contexts` parameters are ordered; implementations
/// MUST process them in the given order without reordering, padding, or
/// coalescing, since context order is part of what the signature/MAC
/// authenticates.
pub trait CryptoProvider {
    type Keypair: EcdhKeypair;

    /// Generate a fresh ephemeral ECDH keypair.
    fn ecdh_generate(&self) -> Self::Keypair;

    /// Sign the ordered concatenation of `contexts` with `signing_key`
    /// (an unframed, raw private-key encoding).
    fn sign(&self, signing_key: &[u8], contexts: &[&[u8]]) -> Result<Vec<u8>>;

    /// Derive the framed public signing key corresponding to `signing_key`,
    /// for populating a local [`crate::peer::PeerRecord`] at `init`.
    fn verifying_key_for(&self, signing_key: &[u8]) -> Result<Vec<u8>>;

    /// Verify `signature` over the ordered concatenation of `contexts`
    /// against `framed_public_key` (a framed, tagged public signing key).
    fn verify(&self, framed_public_key: &[u8], contexts: &[&[u8]], signature: &[u8]) -> Result<()>;

    /// Compute a MAC over the ordered concatenation of `contexts`, keyed by
    /// `key`.
    fn mac(&self, key: &[u8], contexts: &[&[u8]]) -> Vec<u8>;

    /// Verify `tag` as the MAC over the ordered concatenation of
    /// `contexts`, keyed by `key`, in constant time.
    fn verify_mac(&self, key: &[u8], contexts: &[&[u8]], tag: &[u8]) -> Result<()>;

    /// Declared MAC output length, so callers can split a
    /// `signature || mac` payload without a length-discovery round trip.
    fn mac_len(&self) -> usize;

    /// Deterministic key derivation. If `secret` is `None`, behaves as a
    /// pure KDF over `label` and `contexts` (used for `session_id`);
    /// otherwise `secret` supplies the keyed input (used for
    /// `session_master_key` and per-direction record keys).
    fn kdf(&self, secret: Option<&[u8]>, label: &[u8], contexts: &[&[u8]], out: &mut [u8]);

    /// Seal `plaintext` under `key` at record `sequence_number`, returning
    /// a self-framed record.
    fn aead_seal(&self, key: &[u8], sequence_number: u64, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Open a record produced by [`Self::aead_seal`] under `key` at
    /// `sequence_number`.
    fn aead_open(&self, key: &[u8], sequence_number: u64, record: &[u8]) -> Result<Vec<u8>>;

    /// Constant overhead `aead_seal` adds to a plaintext of any length,
    /// independent of the plaintext's own length.
    fn aead_overhead(&self) -> usize;
}
