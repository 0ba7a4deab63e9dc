//! End-to-end handshake and record-layer scenarios, driven entirely through
//! the public `Session` API over an in-memory duplex transport.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use p256::ecdsa::SigningKey;
use rand_core::OsRng;
use secure_session::{container, Error, Session, Transport};

type Directory = Rc<RefCell<HashMap<Vec<u8>, Vec<u8>>>>;
type Queue = Rc<RefCell<VecDeque<Vec<u8>>>>;

struct DuplexTransport {
    outbound: Queue,
    inbound: Queue,
    directory: Directory,
}

impl Transport for DuplexTransport {
    fn send_data(&mut self, buf: &[u8]) -> secure_session::Result<()> {
        self.outbound.borrow_mut().push_back(buf.to_vec());
        Ok(())
    }

    fn receive_data(&mut self, buf: &mut [u8]) -> secure_session::Result<usize> {
        let msg = self.inbound.borrow_mut().pop_front().ok_or(Error::InvalidParameter("no inbound message queued"))?;
        if msg.len() > buf.len() {
            return Err(Error::BufferTooSmall { needed: msg.len(), available: buf.len() });
        }
        buf[..msg.len()].copy_from_slice(&msg);
        Ok(msg.len())
    }

    fn get_public_key_for_id(&mut self, id: &[u8]) -> secure_session::Result<Vec<u8>> {
        self.directory.borrow().get(id).cloned().ok_or(Error::InvalidParameter("unknown peer id"))
    }
}

fn signing_key_pair() -> (Vec<u8>, Vec<u8>) {
    let signing_key = SigningKey::random(&mut OsRng);
    let framed_verifying_key =
        container::make(container::EC_PUB_KEY_TAG, signing_key.verifying_key().to_encoded_point(true).as_bytes());
    (signing_key.to_bytes().to_vec(), framed_verifying_key)
}

/// Build a connected alice/bob pair and a populated identity directory,
/// but don't run the handshake yet.
fn new_pair() -> (Session<DuplexTransport>, Session<DuplexTransport>) {
    let (alice_signing_key, alice_verifying_key) = signing_key_pair();
    let (bob_signing_key, bob_verifying_key) = signing_key_pair();

    let directory = Rc::new(RefCell::new(HashMap::new()));
    directory.borrow_mut().insert(b"alice".to_vec(), alice_verifying_key);
    directory.borrow_mut().insert(b"bob".to_vec(), bob_verifying_key);

    let alice_to_bob = Rc::new(RefCell::new(VecDeque::new()));
    let bob_to_alice = Rc::new(RefCell::new(VecDeque::new()));

    let alice_transport =
        DuplexTransport { outbound: alice_to_bob.clone(), inbound: bob_to_alice.clone(), directory: directory.clone() };
    let bob_transport = DuplexTransport { outbound: bob_to_alice, inbound: alice_to_bob, directory };

    let alice = Session::init(b"alice".to_vec(), alice_signing_key, alice_transport).unwrap();
    let bob = Session::init(b"bob".to_vec(), bob_signing_key, bob_transport).unwrap();
    (alice, bob)
}

/// Drive client-hello -> server-hello -> client-finish -> server-finish to
/// completion on an already-constructed pair.
fn complete_handshake(alice: &mut Session<DuplexTransport>, bob: &mut Session<DuplexTransport>) {
    let mut scratch = [0u8; 0];
    alice.connect().unwrap();
    assert_eq!(bob.receive(&mut scratch).unwrap(), 0); // server-hello
    assert_eq!(alice.receive(&mut scratch).unwrap(), 0); // client-finish
    assert_eq!(bob.receive(&mut scratch).unwrap(), 0); // server-finish
    assert_eq!(alice.receive(&mut scratch).unwrap(), 0);
}

#[test]
fn full_handshake_reaches_established_on_both_sides() {
    let (mut alice, mut bob) = new_pair();
    complete_handshake(&mut alice, &mut bob);

    // Established: sending now succeeds rather than erroring on protocol state.
    assert!(alice.send(b"ping").is_ok());
}

#[test]
fn established_session_round_trips_application_records() {
    let (mut alice, mut bob) = new_pair();
    complete_handshake(&mut alice, &mut bob);

    alice.send(b"hello world").unwrap();
    let mut buf = [0u8; 64];
    let n = bob.receive(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"hello world");

    bob.send(b"hello alice").unwrap();
    let n = alice.receive(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"hello alice");
}

#[test]
fn tampered_server_hello_is_rejected_and_client_state_does_not_advance() {
    let (alice_signing_key, alice_verifying_key) = signing_key_pair();
    let (bob_signing_key, bob_verifying_key) = signing_key_pair();

    let directory = Rc::new(RefCell::new(HashMap::new()));
    directory.borrow_mut().insert(b"alice".to_vec(), alice_verifying_key);
    directory.borrow_mut().insert(b"bob".to_vec(), bob_verifying_key);

    let alice_to_bob: Queue = Rc::new(RefCell::new(VecDeque::new()));
    let bob_to_alice: Queue = Rc::new(RefCell::new(VecDeque::new()));

    let alice_transport =
        DuplexTransport { outbound: alice_to_bob.clone(), inbound: bob_to_alice.clone(), directory: directory.clone() };
    let bob_transport = DuplexTransport { outbound: bob_to_alice.clone(), inbound: alice_to_bob, directory };

    let mut alice = Session::init(b"alice".to_vec(), alice_signing_key, alice_transport).unwrap();
    let mut bob = Session::init(b"bob".to_vec(), bob_signing_key, bob_transport).unwrap();

    let mut scratch = [0u8; 0];
    alice.connect().unwrap();
    assert_eq!(bob.receive(&mut scratch).unwrap(), 0); // server-hello now queued for alice

    // Flip a bit in the queued server-hello before alice consumes it.
    {
        let mut queue = bob_to_alice.borrow_mut();
        let server_hello = queue.front_mut().unwrap();
        let last = server_hello.len() - 1;
        server_hello[last] ^= 0x01;
    }

    assert!(matches!(alice.receive(&mut scratch), Err(Error::InvalidParameter(_))));
}

#[test]
fn send_before_established_is_rejected() {
    let (mut alice, _bob) = new_pair();
    assert!(matches!(alice.send(b"too early"), Err(Error::InvalidParameter(_))));
}

#[test]
fn unknown_peer_identity_aborts_handshake() {
    let (alice_signing_key, _alice_verifying_key) = signing_key_pair();
    let (bob_signing_key, bob_verifying_key) = signing_key_pair();

    // Directory only knows about bob; alice's identity is never registered.
    let directory = Rc::new(RefCell::new(HashMap::new()));
    directory.borrow_mut().insert(b"bob".to_vec(), bob_verifying_key);

    let alice_to_bob = Rc::new(RefCell::new(VecDeque::new()));
    let bob_to_alice = Rc::new(RefCell::new(VecDeque::new()));

    let alice_transport =
        DuplexTransport { outbound: alice_to_bob.clone(), inbound: bob_to_alice.clone(), directory: directory.clone() };
    let bob_transport = DuplexTransport { outbound: bob_to_alice, inbound: alice_to_bob, directory };

    let mut alice = Session::init(b"alice".to_vec(), alice_signing_key, alice_transport).unwrap();
    let mut bob = Session::init(b"bob".to_vec(), bob_signing_key, bob_transport).unwrap();

    alice.connect().unwrap();
    let mut scratch = [0u8; 0];
    assert!(matches!(bob.receive(&mut scratch), Err(Error::InvalidParameter(_))));
}
