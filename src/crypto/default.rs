//! `DefaultCryptoProvider`: the one concrete backend this crate ships,
//! built entirely from RustCrypto primitives — P-256 ECDH, ECDSA-P256/SHA-256
//! signatures, HMAC-SHA256, HKDF-SHA256, and ChaCha20-Poly1305.

use chacha20poly1305::aead::{Aead, Payload};
use chacha20poly1305::{ChaCha20Poly1305, KeyInit};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::PublicKey;
use rand_core::OsRng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{CryptoProvider, EcdhKeypair};
use crate::container::{self, EC_PUB_KEY_TAG};
use crate::error::{Error, Result};

const MAC_LEN: usize = 32;
const AEAD_TAG_LEN: usize = 16;
const RECORD_TAG: container::Tag = *b"RECD";

/// The facade's one concrete backend. Stateless: every operation takes its
/// key material as an argument rather than holding it.
#[derive(Default)]
pub struct DefaultCryptoProvider;

/// An ephemeral P-256 ECDH keypair.
pub struct P256Keypair {
    secret: p256::ecdh::EphemeralSecret,
}

impl EcdhKeypair for P256Keypair {
    fn framed_public_key(&self) -> Vec<u8> {
        let point = self.secret.public_key().to_encoded_point(true);
        container::make(EC_PUB_KEY_TAG, point.as_bytes())
    }

    fn derive_shared_secret(&self, peer_framed_public_key: &[u8]) -> Result<Vec<u8>> {
        let parsed = container::parse(peer_framed_public_key, EC_PUB_KEY_TAG)?;
        let peer_public = PublicKey::from_sec1_bytes(parsed.payload)
            .map_err(|_| Error::InvalidParameter("malformed peer ECDH public key"))?;

        let shared = self.secret.diffie_hellman(&peer_public);
        let shared_bytes = shared.raw_secret_bytes().as_slice();

        // Reject a degenerate (all-zero) shared secret: on a well-formed
        // curve point this cannot happen honestly, and is the signature of
        // a small-subgroup / invalid-curve attack.
        if shared_bytes.ct_eq(&[0u8; 32]).unwrap_u8() == 1 {
            return Err(Error::InvalidParameter("degenerate ECDH shared secret"));
        }

        Ok(shared_bytes.to_vec())
    }
}

impl CryptoProvider for DefaultCryptoProvider {
    type Keypair = P256Keypair;

    fn ecdh_generate(&self) -> Self::Keypair {
        P256Keypair { secret: p256::ecdh::EphemeralSecret::random(&mut OsRng) }
    }

    fn sign(&self, signing_key: &[u8], contexts: &[&[u8]]) -> Result<Vec<u8>> {
        let key = SigningKey::from_slice(signing_key)
            .map_err(|_| Error::InvalidParameter("malformed signing private key"))?;
        let message = concat_contexts(contexts);
        let signature: Signature = key.try_sign(&message).map_err(|_| Error::InvalidSignature)?;
        Ok(signature.to_bytes().to_vec())
    }

    fn verifying_key_for(&self, signing_key: &[u8]) -> Result<Vec<u8>> {
        let key = SigningKey::from_slice(signing_key)
            .map_err(|_| Error::InvalidParameter("malformed signing private key"))?;
        let point = key.verifying_key().to_encoded_point(true);
        Ok(container::make(EC_PUB_KEY_TAG, point.as_bytes()))
    }

    fn verify(&self, framed_public_key: &[u8], contexts: &[&[u8]], signature: &[u8]) -> Result<()> {
        let parsed = container::parse(framed_public_key, EC_PUB_KEY_TAG)?;
        let key = VerifyingKey::from_sec1_bytes(parsed.payload)
            .map_err(|_| Error::InvalidParameter("malformed signing public key"))?;
        let signature = Signature::from_slice(signature).map_err(|_| Error::InvalidSignature)?;
        let message = concat_contexts(contexts);
        key.verify(&message, &signature).map_err(|_| Error::InvalidSignature)
    }

    fn mac(&self, key: &[u8], contexts: &[&[u8]]) -> Vec<u8> {
        let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
        for context in contexts {
            mac.update(context);
        }
        mac.finalize().into_bytes().to_vec()
    }

    fn verify_mac(&self, key: &[u8], contexts: &[&[u8]], tag: &[u8]) -> Result<()> {
        let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
        for context in contexts {
            mac.update(context);
        }
        mac.verify_slice(tag).map_err(|_| Error::InvalidMac)
    }

    fn mac_len(&self) -> usize {
        MAC_LEN
    }

    fn kdf(&self, secret: Option<&[u8]>, label: &[u8], contexts: &[&[u8]], out: &mut [u8]) {
        let ikm = secret.unwrap_or(&[]);
        let hk = Hkdf::<Sha256>::new(None, ikm);

        let mut info = Vec::with_capacity(label.len() + contexts.iter().map(|c| c.len()).sum::<usize>());
        info.extend_from_slice(label);
        for context in contexts {
            info.extend_from_slice(context);
        }

        hk.expand(&info, out).expect("output length is a small fixed constant, well under HKDF's limit");
    }

    fn aead_seal(&self, key: &[u8], sequence_number: u64, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| Error::InvalidParameter("malformed record key"))?;
        let nonce = nonce_for(sequence_number);
        let aad = sequence_number.to_be_bytes();

        let sealed = cipher
            .encrypt(&nonce, Payload { msg: plaintext, aad: &aad })
            .map_err(|_| Error::NoMemory)?;

        Ok(container::make(RECORD_TAG, &sealed))
    }

    fn aead_open(&self, key: &[u8], sequence_number: u64, record: &[u8]) -> Result<Vec<u8>> {
        let parsed = container::parse(record, RECORD_TAG)?;
        if parsed.payload.len() < AEAD_TAG_LEN {
            return Err(Error::InvalidParameter("sealed record shorter than AEAD tag"));
        }

        let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| Error::InvalidParameter("malformed record key"))?;
        let nonce = nonce_for(sequence_number);
        let aad = sequence_number.to_be_bytes();

        cipher
            .decrypt(&nonce, Payload { msg: parsed.payload, aad: &aad })
            .map_err(|_| Error::InvalidMac)
    }

    fn aead_overhead(&self) -> usize {
        container::HEADER_SIZE + AEAD_TAG_LEN
    }
}

fn concat_contexts(contexts: &[&[u8]]) -> Vec<u8> {
    let mut message = Vec::with_capacity(contexts.iter().map(|c| c.len()).sum());
    for context in contexts {
        message.extend_from_slice(context);
    }
    message
}

fn nonce_for(sequence_number: u64) -> chacha20poly1305::Nonce {
    let mut bytes = [0u8; 12];
    bytes[4..].copy_from_slice(&sequence_number.to_be_bytes());
    chacha20poly1305::Nonce::from(bytes)
}
