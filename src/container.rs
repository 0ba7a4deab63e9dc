//! Tagged, length-prefixed, checksummed byte container.
//!
//! Every handshake message — and several of the fields nested inside a
//! handshake message — is framed as a `Container`: a fixed-size header
//! (4-byte ASCII tag, 4-byte big-endian length, 4-byte checksum) followed by
//! `length` bytes of payload. Parsing never does pointer arithmetic into the
//! caller's buffer; it yields bounds-checked offset/length views.

use crate::error::{Error, Result};

/// 4-byte ASCII tag identifying a container's contents.
pub type Tag = [u8; 4];

/// Tag for the outer handshake message container.
pub const PROTO_TAG: Tag = *b"PROT";

/// Tag for the inner peer-identifier container.
pub const ID_TAG: Tag = *b"SSID";

/// Tag prefix for framed EC public keys (ECDH and signing).
pub const EC_PUB_KEY_TAG: Tag = *b"RPUB";

/// Size of the container header: tag (4) + length (4) + checksum (4).
pub const HEADER_SIZE: usize = 12;

/// Build a framed container: header (tag, length, checksum) followed by `payload`.
pub fn make(tag: Tag, payload: &[u8]) -> Vec<u8> {
    let length = payload.len() as u32;
    let checksum = checksum_of(&tag, length, payload);

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&tag);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(&checksum.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

fn checksum_of(tag: &Tag, length: u32, payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(tag);
    hasher.update(&length.to_be_bytes());
    hasher.update(payload);
    hasher.finalize()
}

/// A parsed container: the validated payload view plus the number of input
/// bytes consumed (header + payload), so callers can locate the next
/// container immediately following this one.
pub struct Parsed<'a> {
    pub payload: &'a [u8],
    pub consumed: usize,
}

/// Parse `bytes` as a container tagged `expected_tag`. Fails with
/// [`Error::InvalidParameter`] if the input is too short, the tag does not
/// match, the declared length does not fit within `bytes`, or the checksum
/// does not verify.
pub fn parse<'a>(bytes: &'a [u8], expected_tag: Tag) -> Result<Parsed<'a>> {
    if bytes.len() < HEADER_SIZE {
        return Err(Error::InvalidParameter("container shorter than header"));
    }

    let tag: Tag = bytes[0..4].try_into().expect("slice is 4 bytes");
    if tag != expected_tag {
        return Err(Error::InvalidParameter("container tag mismatch"));
    }

    let length = u32::from_be_bytes(bytes[4..8].try_into().expect("slice is 4 bytes")) as usize;
    let declared_checksum = u32::from_be_bytes(bytes[8..12].try_into().expect("slice is 4 bytes"));

    let total = HEADER_SIZE.checked_add(length).ok_or(Error::InvalidParameter("container length overflow"))?;
    if bytes.len() < total {
        return Err(Error::InvalidParameter("container declared length exceeds input"));
    }

    let payload = &bytes[HEADER_SIZE..total];
    let actual_checksum = checksum_of(&tag, length as u32, payload);
    if actual_checksum != declared_checksum {
        return Err(Error::InvalidParameter("container checksum mismatch"));
    }

    Ok(Parsed { payload, consumed: total })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_empty_payload() {
        let framed = make(PROTO_TAG, &[]);
        let parsed = parse(&framed, PROTO_TAG).unwrap();
        assert_eq!(parsed.payload, b"");
        assert_eq!(parsed.consumed, framed.len());
    }

    #[test]
    fn round_trip_arbitrary_payload() {
        let payload = b"the quick brown fox jumps over the lazy dog";
        let framed = make(ID_TAG, payload);
        let parsed = parse(&framed, ID_TAG).unwrap();
        assert_eq!(parsed.payload, payload);
    }

    #[test]
    fn rejects_wrong_tag() {
        let framed = make(PROTO_TAG, b"hello");
        assert!(matches!(parse(&framed, ID_TAG), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn rejects_short_input() {
        assert!(matches!(parse(&[0u8; 4], PROTO_TAG), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut framed = make(PROTO_TAG, b"0123456789");
        framed.truncate(framed.len() - 1);
        assert!(matches!(parse(&framed, PROTO_TAG), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn rejects_tampered_byte() {
        let mut framed = make(PROTO_TAG, b"hello world");
        let last = framed.len() - 1;
        framed[last] ^= 0x01;
        assert!(matches!(parse(&framed, PROTO_TAG), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn parse_reports_bytes_consumed_for_trailing_data() {
        let mut framed = make(ID_TAG, b"peer-id");
        framed.extend_from_slice(b"trailing-bytes-belong-to-the-next-container");
        let parsed = parse(&framed, ID_TAG).unwrap();
        assert_eq!(parsed.payload, b"peer-id");
        assert_eq!(parsed.consumed, HEADER_SIZE + 7);
    }

    proptest::proptest! {
        #[test]
        fn round_trip_holds_for_arbitrary_payloads(payload in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..4096)) {
            let framed = make(ID_TAG, &payload);
            let parsed = parse(&framed, ID_TAG).unwrap();
            proptest::prop_assert_eq!(parsed.payload, payload.as_slice());
        }

        #[test]
        fn single_byte_tamper_is_always_caught(payload in proptest::collection::vec(proptest::prelude::any::<u8>(), 1..256), flip_index in 0usize..256) {
            let mut framed = make(ID_TAG, &payload);
            let index = flip_index % framed.len();
            framed[index] ^= 0x01;
            proptest::prop_assert!(parse(&framed, ID_TAG).is_err());
        }
    }
}
