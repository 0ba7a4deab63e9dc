//! A mutually-authenticated secure channel: a four-message ECDH handshake
//! binding peer identities by digital signatures, followed by an
//! authenticated-encryption record layer.
//!
//! The handshake and record layer are driven entirely through the
//! [`Transport`] capability set — this crate never touches a socket
//! directly — and are expressed over an abstract [`CryptoProvider`] facade,
//! with [`DefaultCryptoProvider`] as the one concrete backend this crate
//! ships (P-256 ECDH/ECDSA, HKDF-SHA256, HMAC-SHA256, ChaCha20-Poly1305).

pub mod callbacks;
pub mod container;
pub mod crypto;
pub mod error;
mod handshake;
pub mod peer;
mod record;
mod session;

pub use callbacks::Transport;
pub use crypto::{CryptoProvider, DefaultCryptoProvider, EcdhKeypair};
pub use error::{Error, Result};
pub use peer::PeerRecord;
pub use session::Session;
