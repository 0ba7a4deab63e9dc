//! Remote- and local-peer bookkeeping.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::container::{self, EC_PUB_KEY_TAG};
use crate::error::{Error, Result};

/// One side of a session: an opaque identifier, a framed ephemeral ECDH
/// public key, and a framed long-term signing public key.
///
/// For the local side (`we`), these fields are populated at
/// [`crate::Session::init`]. For the remote side (`peer`), they are
/// populated during the handshake once the peer's identity has been
/// validated — until then the record is [`PeerRecord::empty`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PeerRecord {
    pub id: Vec<u8>,
    pub ecdh_public_key: Vec<u8>,
    pub sign_public_key: Vec<u8>,
}

impl PeerRecord {
    pub fn empty() -> Self {
        PeerRecord {
            id: Vec::new(),
            ecdh_public_key: Vec::new(),
            sign_public_key: Vec::new(),
        }
    }

    pub fn new(id: Vec<u8>, ecdh_public_key: Vec<u8>, sign_public_key: Vec<u8>) -> Result<Self> {
        validate_framed_ec_key(&ecdh_public_key)?;
        validate_framed_ec_key(&sign_public_key)?;
        Ok(PeerRecord { id, ecdh_public_key, sign_public_key })
    }

    /// Zeroize and reset to the empty record. Used on any handshake-step
    /// failure so a partially-populated peer record never survives past
    /// the step that produced it.
    pub fn clear(&mut self) {
        self.zeroize();
        self.id = Vec::new();
        self.ecdh_public_key = Vec::new();
        self.sign_public_key = Vec::new();
    }
}

/// Validate that `framed` is a container tagged with the canonical EC
/// public-key prefix and that its payload is non-empty — required of both
/// the ECDH and signing keys carried on a [`PeerRecord`].
fn validate_framed_ec_key(framed: &[u8]) -> Result<()> {
    let parsed = container::parse(framed, EC_PUB_KEY_TAG)?;
    if parsed.payload.is_empty() {
        return Err(Error::InvalidParameter("framed EC key has empty payload"));
    }
    Ok(())
}
