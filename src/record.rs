//! The post-handshake record layer: per-direction key derivation plus
//! `wrap`/`unwrap` over a sequence-numbered AEAD.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{CryptoProvider, SESSION_MASTER_KEY_LEN};
use crate::error::{Error, Result};

const CLIENT_TO_SERVER_LABEL: &[u8] = b"secure-session client-to-server";
const SERVER_TO_CLIENT_LABEL: &[u8] = b"secure-session server-to-client";
const RECORD_KEY_LEN: usize = 32;

/// The pair of independent per-direction keys derived once at
/// `Established`, plus the sequence counters that make `wrap` deterministic
/// in key material and position.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct RecordKeys {
    send_key: [u8; RECORD_KEY_LEN],
    recv_key: [u8; RECORD_KEY_LEN],
    #[zeroize(skip)]
    send_sequence: u64,
    #[zeroize(skip)]
    recv_sequence: u64,
}

impl RecordKeys {
    /// Derive the client→server and server→client keys from
    /// `session_master_key` and `session_id`, then pick which is `send`
    /// and which is `recv` according to `is_client`.
    pub(crate) fn derive<C: CryptoProvider>(
        crypto: &C,
        session_master_key: &[u8; SESSION_MASTER_KEY_LEN],
        session_id: &[u8],
        is_client: bool,
    ) -> Self {
        let mut client_to_server = [0u8; RECORD_KEY_LEN];
        crypto.kdf(Some(session_master_key), CLIENT_TO_SERVER_LABEL, &[session_id], &mut client_to_server);

        let mut server_to_client = [0u8; RECORD_KEY_LEN];
        crypto.kdf(Some(session_master_key), SERVER_TO_CLIENT_LABEL, &[session_id], &mut server_to_client);

        let (send_key, recv_key) =
            if is_client { (client_to_server, server_to_client) } else { (server_to_client, client_to_server) };

        RecordKeys { send_key, recv_key, send_sequence: 0, recv_sequence: 0 }
    }

    pub(crate) fn wrap<C: CryptoProvider>(&mut self, crypto: &C, plaintext: &[u8]) -> Result<Vec<u8>> {
        let sealed = crypto.aead_seal(&self.send_key, self.send_sequence, plaintext)?;
        self.send_sequence = self.send_sequence.checked_add(1).ok_or(Error::InvalidParameter("send sequence number exhausted"))?;
        Ok(sealed)
    }

    pub(crate) fn unwrap<C: CryptoProvider>(&mut self, crypto: &C, record: &[u8]) -> Result<Vec<u8>> {
        let plaintext = crypto.aead_open(&self.recv_key, self.recv_sequence, record)?;
        self.recv_sequence = self.recv_sequence.checked_add(1).ok_or(Error::InvalidParameter("recv sequence number exhausted"))?;
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::DefaultCryptoProvider;

    #[test]
    fn both_sides_derive_matching_keys_and_round_trip() {
        let crypto = DefaultCryptoProvider;
        let session_master_key = [0x7au8; SESSION_MASTER_KEY_LEN];
        let session_id = [0x01u8; 8];

        let mut client = RecordKeys::derive(&crypto, &session_master_key, &session_id, true);
        let mut server = RecordKeys::derive(&crypto, &session_master_key, &session_id, false);

        let sealed = client.wrap(&crypto, b"hello server").unwrap();
        let opened = server.unwrap(&crypto, &sealed).unwrap();
        assert_eq!(opened, b"hello server");

        let sealed = server.wrap(&crypto, b"hello client").unwrap();
        let opened = client.unwrap(&crypto, &sealed).unwrap();
        assert_eq!(opened, b"hello client");
    }

    #[test]
    fn out_of_order_delivery_fails_authentication() {
        let crypto = DefaultCryptoProvider;
        let session_master_key = [0x7au8; SESSION_MASTER_KEY_LEN];
        let session_id = [0x01u8; 8];

        let mut client = RecordKeys::derive(&crypto, &session_master_key, &session_id, true);
        let mut server = RecordKeys::derive(&crypto, &session_master_key, &session_id, false);

        let first = client.wrap(&crypto, b"one").unwrap();
        let second = client.wrap(&crypto, b"two").unwrap();

        assert!(server.unwrap(&crypto, &second).is_err());
        assert!(server.unwrap(&crypto, &first).is_ok());
    }
}
