//! The public `Session` API: construction, the handshake driver, and the
//! post-handshake record interface.

use zeroize::Zeroize;

use crate::callbacks::Transport;
use crate::crypto::{CryptoProvider, DefaultCryptoProvider};
use crate::error::{Error, Result};
use crate::handshake::{self, HandshakeState};
use crate::peer::PeerRecord;
use crate::record::RecordKeys;

/// One end of a mutually-authenticated secure channel.
///
/// Drives the four-message handshake through `connect`/`receive`, then
/// switches to wrapping/unwrapping application records. Generic over the
/// crypto backend (`C`, defaulting to [`DefaultCryptoProvider`]) and the
/// transport/identity callbacks (`T`).
pub struct Session<T: Transport, C: CryptoProvider = DefaultCryptoProvider> {
    crypto: C,
    transport: T,
    keypair: Option<C::Keypair>,
    we: PeerRecord,
    peer: PeerRecord,
    local_signing_key: Vec<u8>,
    is_client: bool,
    state: HandshakeState,
    session_id: Option<[u8; crate::crypto::SESSION_ID_LEN]>,
    session_master_key: Option<[u8; crate::crypto::SESSION_MASTER_KEY_LEN]>,
    record_keys: Option<RecordKeys>,
}

impl<T: Transport> Session<T, DefaultCryptoProvider> {
    /// Construct a session over the default crypto backend.
    pub fn init(id: Vec<u8>, signing_key: Vec<u8>, transport: T) -> Result<Self> {
        Self::init_with_provider(id, signing_key, transport, DefaultCryptoProvider)
    }
}

impl<T: Transport, C: CryptoProvider> Session<T, C> {
    /// Construct a session over an explicit crypto backend.
    pub fn init_with_provider(id: Vec<u8>, signing_key: Vec<u8>, transport: T, crypto: C) -> Result<Self> {
        let keypair = crypto.ecdh_generate();
        let ecdh_public_key = keypair.framed_public_key();
        let sign_public_key = crypto.verifying_key_for(&signing_key)?;

        let we = PeerRecord::new(id, ecdh_public_key, sign_public_key)?;

        tracing::debug!(id = ?we.id, "session initialized");

        Ok(Session {
            crypto,
            transport,
            keypair: Some(keypair),
            we,
            peer: PeerRecord::empty(),
            local_signing_key: signing_key,
            is_client: false,
            state: HandshakeState::AwaitingClientHello,
            session_id: None,
            session_master_key: None,
            record_keys: None,
        })
    }

    /// Emit the client-hello and become the client side of the handshake.
    /// Invalid once the handshake has completed.
    pub fn connect(&mut self) -> Result<()> {
        if self.state != HandshakeState::AwaitingClientHello {
            return Err(Error::InvalidParameter("connect called outside the initial handshake state"));
        }

        let keypair = self.keypair.as_ref().expect("keypair present before cleanup");
        let outbound = handshake::build_client_hello(&self.crypto, keypair, &self.we, &self.local_signing_key)?;
        self.transport.send_data(&outbound)?;

        self.is_client = true;
        self.state = HandshakeState::AwaitingServerHello;
        tracing::debug!("client-hello sent, awaiting server-hello");
        Ok(())
    }

    /// Feed the next inbound message through the handshake, or — once
    /// `Established` — through the record layer, writing decrypted
    /// plaintext into `msg_buf`. Returns `0` while the handshake is still
    /// in progress, matching the reference's "0 during handshake" contract.
    pub fn receive(&mut self, msg_buf: &mut [u8]) -> Result<usize> {
        match self.state {
            HandshakeState::Established => self.receive_record(msg_buf),
            _ => {
                self.receive_handshake_step()?;
                Ok(0)
            }
        }
    }

    /// Seal `msg` and send it. Only valid once the handshake has reached
    /// `Established`.
    pub fn send(&mut self, msg: &[u8]) -> Result<usize> {
        if self.state != HandshakeState::Established {
            return Err(Error::InvalidParameter("send called before handshake completion"));
        }

        let record_keys = self.record_keys.as_mut().expect("Established implies record_keys is set");
        let sealed = record_keys.wrap(&self.crypto, msg)?;
        self.transport.send_data(&sealed)?;
        tracing::trace!(bytes = msg.len(), "record sent");
        Ok(msg.len())
    }

    fn receive_handshake_step(&mut self) -> Result<()> {
        let mut inbound = vec![0u8; MAX_HANDSHAKE_MESSAGE_SIZE];
        let n = self.transport.receive_data(&mut inbound)?;
        inbound.truncate(n);

        match self.state {
            HandshakeState::AwaitingClientHello => {
                let keypair = self.keypair.as_ref().expect("keypair present before cleanup");
                let peer_id = handshake::peek_peer_id(&inbound)?;
                let peer_sign_key = self
                    .transport
                    .get_public_key_for_id(&peer_id)
                    .map_err(|_| Error::InvalidParameter("get_public_key_for_id failed"))?;

                let outbound = handshake::handle_client_hello(
                    &self.crypto,
                    keypair,
                    &self.we,
                    &mut self.peer,
                    &self.local_signing_key,
                    &inbound,
                    peer_sign_key,
                )?;
                self.transport.send_data(&outbound)?;
                self.state = HandshakeState::AwaitingClientFinish;
                tracing::debug!("server-hello sent, awaiting client-finish");
            }
            HandshakeState::AwaitingServerHello => {
                let keypair = self.keypair.as_ref().expect("keypair present before cleanup");
                let peer_id = handshake::peek_peer_id(&inbound)?;
                let peer_sign_key = self
                    .transport
                    .get_public_key_for_id(&peer_id)
                    .map_err(|_| Error::InvalidParameter("get_public_key_for_id failed"))?;

                let outbound = handshake::handle_server_hello(
                    &self.crypto,
                    keypair,
                    &self.we,
                    &mut self.peer,
                    &self.local_signing_key,
                    &inbound,
                    peer_sign_key,
                );
                let (outbound, session_id, session_master_key) = match outbound {
                    Ok(v) => v,
                    Err(e) => {
                        self.peer.clear();
                        return Err(e);
                    }
                };
                self.transport.send_data(&outbound)?;
                self.session_id = Some(session_id);
                self.session_master_key = Some(session_master_key);
                self.state = HandshakeState::AwaitingServerFinish;
                tracing::debug!("client-finish sent, awaiting server-finish");
            }
            HandshakeState::AwaitingClientFinish => {
                let keypair = self.keypair.as_ref().expect("keypair present before cleanup");
                let result = handshake::handle_client_finish(&self.crypto, keypair, &self.we, &self.peer, &inbound);
                let (outbound, session_id, session_master_key) = match result {
                    Ok(v) => v,
                    Err(e) => {
                        self.peer.clear();
                        return Err(e);
                    }
                };
                self.transport.send_data(&outbound)?;
                self.session_id = Some(session_id);
                self.session_master_key = Some(session_master_key);
                self.establish(session_id, session_master_key);
            }
            HandshakeState::AwaitingServerFinish => {
                let session_id = self.session_id.expect("session_id set when entering AwaitingServerFinish");
                let session_master_key =
                    self.session_master_key.expect("session_master_key set when entering AwaitingServerFinish");
                let keypair = self.keypair.as_ref().expect("keypair present before cleanup");
                handshake::handle_server_finish(&self.crypto, keypair, &session_id, &session_master_key, &inbound)?;
                self.establish(session_id, session_master_key);
            }
            HandshakeState::Established => unreachable!("dispatched separately in receive"),
        }

        Ok(())
    }

    fn establish(&mut self, session_id: [u8; crate::crypto::SESSION_ID_LEN], session_master_key: [u8; crate::crypto::SESSION_MASTER_KEY_LEN]) {
        self.record_keys = Some(RecordKeys::derive(&self.crypto, &session_master_key, &session_id, self.is_client));
        self.state = HandshakeState::Established;
        tracing::debug!("handshake complete, session established");
    }

    fn receive_record(&mut self, msg_buf: &mut [u8]) -> Result<usize> {
        let mut sealed = vec![0u8; msg_buf.len() + self.crypto.aead_overhead()];
        let n = self.transport.receive_data(&mut sealed)?;
        sealed.truncate(n);

        let record_keys = self.record_keys.as_mut().expect("Established implies record_keys is set");
        let plaintext = record_keys.unwrap(&self.crypto, &sealed)?;

        if msg_buf.len() < plaintext.len() {
            return Err(Error::BufferTooSmall { needed: plaintext.len(), available: msg_buf.len() });
        }
        msg_buf[..plaintext.len()].copy_from_slice(&plaintext);
        tracing::trace!(bytes = plaintext.len(), "record received");
        Ok(plaintext.len())
    }

    /// Zeroize all key material. Safe to call in any state, and called
    /// automatically on `Drop` for callers that don't invoke it explicitly.
    pub fn cleanup(&mut self) {
        self.keypair = None;
        self.local_signing_key.zeroize();
        self.peer.clear();
        self.session_id.zeroize();
        self.session_master_key.zeroize();
        self.record_keys = None;
        tracing::debug!("session cleaned up");
    }
}

impl<T: Transport, C: CryptoProvider> Drop for Session<T, C> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Upper bound on a single handshake message: the container header, the ID
/// container, a framed EC public key, and a generous allowance for the
/// signature/MAC tail.
const MAX_HANDSHAKE_MESSAGE_SIZE: usize = 2048;
