//! The four-message handshake: message construction, parsing, and the state
//! tag a [`crate::Session`] carries while it runs.

use crate::container::{self, EC_PUB_KEY_TAG, ID_TAG, PROTO_TAG};
use crate::crypto::{CryptoProvider, EcdhKeypair, SESSION_ID_LEN, SESSION_MASTER_KEY_LEN};
use crate::error::{Error, Result};
use crate::peer::PeerRecord;

const SESSION_ID_LABEL: &[u8] = b"secure-session session-id";
const SESSION_MASTER_KEY_LABEL: &[u8] = b"secure-session session-master-key";

/// Where a session sits in the handshake, or past it. Every field a
/// transition needs already lives on `Session` itself, so the tag alone is
/// enough to dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandshakeState {
    AwaitingClientHello,
    AwaitingServerHello,
    AwaitingClientFinish,
    AwaitingServerFinish,
    Established,
}

/// Build the client-hello: `ID(we.id) || ecdh_pub || sign([ecdh_pub])`.
pub(crate) fn build_client_hello<C: CryptoProvider>(
    crypto: &C,
    keypair: &C::Keypair,
    we: &PeerRecord,
    local_signing_key: &[u8],
) -> Result<Vec<u8>> {
    let ecdh_pub = keypair.framed_public_key();
    let signature = crypto.sign(local_signing_key, &[&ecdh_pub])?;

    let payload = [container::make(ID_TAG, &we.id), ecdh_pub, signature].concat();
    Ok(container::make(PROTO_TAG, &payload))
}

/// Server side: consume a client-hello, produce a server-hello.
/// `peer_sign_key` is the caller's already-resolved identity lookup for the
/// sender of `inbound` (see [`peek_peer_id`]).
pub(crate) fn handle_client_hello<C: CryptoProvider>(
    crypto: &C,
    keypair: &C::Keypair,
    we: &PeerRecord,
    peer: &mut PeerRecord,
    local_signing_key: &[u8],
    inbound: &[u8],
    peer_sign_key: Vec<u8>,
) -> Result<Vec<u8>> {
    let (peer_id, peer_ecdh_framed, signature) = parse_hello(inbound)?;
    crypto.verify(&peer_sign_key, &[peer_ecdh_framed], signature)?;

    *peer = PeerRecord::new(peer_id, peer_ecdh_framed.to_vec(), peer_sign_key)?;

    let local_ecdh = keypair.framed_public_key();
    let contexts: [&[u8]; 4] = [&local_ecdh, &peer.ecdh_public_key, &we.id, &peer.id];
    let signature = crypto.sign(local_signing_key, &contexts)?;

    let payload = [container::make(ID_TAG, &we.id), local_ecdh, signature].concat();
    Ok(container::make(PROTO_TAG, &payload))
}

/// Client side: consume a server-hello, produce a client-finish plus the
/// derived `session_id` / `session_master_key`. `peer_sign_key` is the
/// caller's already-resolved identity lookup (see [`peek_peer_id`]).
pub(crate) fn handle_server_hello<C: CryptoProvider>(
    crypto: &C,
    keypair: &C::Keypair,
    we: &PeerRecord,
    peer: &mut PeerRecord,
    local_signing_key: &[u8],
    inbound: &[u8],
    peer_sign_key: Vec<u8>,
) -> Result<(Vec<u8>, [u8; SESSION_ID_LEN], [u8; SESSION_MASTER_KEY_LEN])> {
    let (peer_id, peer_ecdh_framed, signature) = parse_hello(inbound)?;

    let local_ecdh = keypair.framed_public_key();
    let contexts: [&[u8]; 4] = [peer_ecdh_framed, &local_ecdh, &peer_id, &we.id];
    crypto.verify(&peer_sign_key, &contexts, signature)?;

    *peer = PeerRecord::new(peer_id, peer_ecdh_framed.to_vec(), peer_sign_key)?;

    // Canonical order is [client_ecdh, server_ecdh, client_id, server_id];
    // here `we` is the client and `peer` is the server.
    let mut session_id = [0u8; SESSION_ID_LEN];
    crypto.kdf(
        None,
        SESSION_ID_LABEL,
        &[&local_ecdh, &peer.ecdh_public_key, &we.id, &peer.id],
        &mut session_id,
    );

    let shared_secret = keypair.derive_shared_secret(&peer.ecdh_public_key)?;
    let mut session_master_key = [0u8; SESSION_MASTER_KEY_LEN];
    crypto.kdf(Some(&shared_secret), SESSION_MASTER_KEY_LABEL, &[&session_id], &mut session_master_key);

    let finish_signature =
        crypto.sign(local_signing_key, &[&local_ecdh, &peer.ecdh_public_key, &we.id, &peer.id])?;
    let mac = crypto.mac(&session_master_key, &[&peer.ecdh_public_key, &session_id]);

    let payload = [finish_signature, mac].concat();
    let outbound = container::make(PROTO_TAG, &payload);

    Ok((outbound, session_id, session_master_key))
}

/// Server side: consume a client-finish, produce a server-finish plus the
/// derived `session_id` / `session_master_key`.
pub(crate) fn handle_client_finish<C: CryptoProvider>(
    crypto: &C,
    keypair: &C::Keypair,
    we: &PeerRecord,
    peer: &PeerRecord,
    inbound: &[u8],
) -> Result<(Vec<u8>, [u8; SESSION_ID_LEN], [u8; SESSION_MASTER_KEY_LEN])> {
    let parsed = container::parse(inbound, PROTO_TAG)?;
    let mac_len = crypto.mac_len();
    if parsed.payload.len() < mac_len {
        return Err(Error::InvalidParameter("client-finish payload shorter than MAC"));
    }
    let split = parsed.payload.len() - mac_len;
    let signature = &parsed.payload[..split];
    let mac = &parsed.payload[split..];

    let local_ecdh = keypair.framed_public_key();

    // Here `we` is the server and `peer` is the client; this is already the
    // canonical [client_ecdh, server_ecdh, client_id, server_id] order.
    crypto.verify(&peer.sign_public_key, &[&peer.ecdh_public_key, &local_ecdh, &peer.id, &we.id], signature)?;

    let shared_secret = keypair.derive_shared_secret(&peer.ecdh_public_key)?;

    let mut session_id = [0u8; SESSION_ID_LEN];
    crypto.kdf(
        None,
        SESSION_ID_LABEL,
        &[&peer.ecdh_public_key, &local_ecdh, &peer.id, &we.id],
        &mut session_id,
    );

    let mut session_master_key = [0u8; SESSION_MASTER_KEY_LEN];
    crypto.kdf(Some(&shared_secret), SESSION_MASTER_KEY_LABEL, &[&session_id], &mut session_master_key);

    crypto.verify_mac(&session_master_key, &[&local_ecdh, &session_id], mac)?;

    let response_mac = crypto.mac(&session_master_key, &[&peer.ecdh_public_key, &session_id]);
    let outbound = container::make(PROTO_TAG, &response_mac);

    Ok((outbound, session_id, session_master_key))
}

/// Client side: consume a server-finish, authenticating the whole handshake.
pub(crate) fn handle_server_finish<C: CryptoProvider>(
    crypto: &C,
    keypair: &C::Keypair,
    session_id: &[u8],
    session_master_key: &[u8],
    inbound: &[u8],
) -> Result<()> {
    let parsed = container::parse(inbound, PROTO_TAG)?;
    let local_ecdh = keypair.framed_public_key();
    crypto.verify_mac(session_master_key, &[&local_ecdh, session_id], parsed.payload)
}

/// Extract just the sender's identifier from a client-hello or
/// server-hello, without validating the rest of the message. Callers use
/// this to resolve the identity-lookup callback before the borrow-checker-
/// sensitive work of running the full handshake step.
pub(crate) fn peek_peer_id(inbound: &[u8]) -> Result<Vec<u8>> {
    let outer = container::parse(inbound, PROTO_TAG)?;
    let id_parsed = container::parse(outer.payload, ID_TAG)?;
    Ok(id_parsed.payload.to_vec())
}

/// Parse a client-hello or server-hello payload: `ID(peer.id) || peer_ecdh_pub || signature`.
/// `signature` is whatever remains of the outer payload after the two
/// framed fields — its length is never stated explicitly on the wire.
fn parse_hello(inbound: &[u8]) -> Result<(Vec<u8>, &[u8], &[u8])> {
    let outer = container::parse(inbound, PROTO_TAG)?;

    let id_parsed = container::parse(outer.payload, ID_TAG)?;
    let peer_id = id_parsed.payload.to_vec();
    let rest = &outer.payload[id_parsed.consumed..];

    let ec_parsed = container::parse(rest, EC_PUB_KEY_TAG)?;
    let peer_ecdh_framed = &rest[..ec_parsed.consumed];
    let signature = &rest[ec_parsed.consumed..];

    Ok((peer_id, peer_ecdh_framed, signature))
}
