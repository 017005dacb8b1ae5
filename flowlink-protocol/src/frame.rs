//! Frame encoding and validation.
//!
//! Frame format:
//! - TAG (4 bytes): ASCII command identifier, never starting with `0x00`
//! - PAYLOAD (N bytes): command-defined length looked up from the tag
//! - CHECKSUM (2 bytes, little-endian): CRC-16 over the covered bytes
//!
//! Which bytes the checksum covers is selected by [`ChecksumScope`].

use core::fmt;

use crate::crc::Crc16;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Command tag width in bytes
pub const TAG_LEN: usize = 4;

/// Checksum width in bytes
pub const CRC_LEN: usize = Crc16::LENGTH;

/// Packet length used by the reference firmware; must hold the largest
/// request or response frame
pub const DEFAULT_PACKET_LENGTH: usize = 256;

/// Errors that can occur during frame encoding or validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Output buffer cannot hold the encoded frame
    BufferTooSmall,
    /// Frame is shorter than the fields it must carry
    Truncated,
    /// Trailing checksum does not match the covered bytes
    ChecksumMismatch,
}

/// Fixed-width command identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tag([u8; TAG_LEN]);

impl Tag {
    /// Command error reply
    pub const ERRC: Tag = Tag(*b"errc");
    /// Data (checksum) error reply
    pub const ERRD: Tag = Tag(*b"errd");
    /// Value error reply
    pub const ERRV: Tag = Tag(*b"errv");

    pub const fn new(bytes: [u8; TAG_LEN]) -> Self {
        Self(bytes)
    }

    /// Tag from its four ASCII characters, e.g. `Tag::from_ascii(b"gpos")`
    pub const fn from_ascii(name: &[u8; TAG_LEN]) -> Self {
        Self(*name)
    }

    /// Read a tag from the first four bytes of `bytes`
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let head = bytes.get(..TAG_LEN)?;
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(head);
        Some(Self(tag))
    }

    pub const fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }

    /// Numeric code as transmitted (first byte least significant)
    pub const fn code(&self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// Whether this is one of the reserved error reply tags
    pub fn is_error_reply(&self) -> bool {
        *self == Self::ERRC || *self == Self::ERRD || *self == Self::ERRV
    }
}

impl From<u32> for Tag {
    fn from(code: u32) -> Self {
        Self(code.to_le_bytes())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.iter().all(|b| b.is_ascii_graphic()) {
            write!(f, "Tag(\"")?;
            for &b in &self.0 {
                write!(f, "{}", b as char)?;
            }
            write!(f, "\")")
        } else {
            write!(f, "Tag({:#010x})", self.code())
        }
    }
}

/// Bytes covered by the frame checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ChecksumScope {
    /// CRC over tag and payload; every frame carries a checksum
    #[default]
    TagAndPayload,
    /// CRC over the payload only, omitted for empty payloads (legacy hosts)
    PayloadOnly,
}

impl ChecksumScope {
    /// Whether a frame with `payload_len` payload bytes ends in a checksum
    pub const fn has_checksum(self, payload_len: usize) -> bool {
        match self {
            ChecksumScope::TagAndPayload => true,
            ChecksumScope::PayloadOnly => payload_len > 0,
        }
    }

    /// Checksum of a frame under this scope
    pub fn checksum(self, tag: &Tag, payload: &[u8]) -> u16 {
        let mut crc = Crc16::new();
        if self == ChecksumScope::TagAndPayload {
            crc.add_bytes(tag.as_bytes());
        }
        crc.add_bytes(payload);
        crc.get()
    }
}

/// Error reply kinds answered with a bare reserved tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorReply {
    /// Command not recognized or cannot be processed (`errc`)
    Command,
    /// Checksum of the data section did not match (`errd`)
    Data,
    /// A value in the request is out of range (`errv`)
    Value,
}

impl ErrorReply {
    pub const fn tag(self) -> Tag {
        match self {
            ErrorReply::Command => Tag::ERRC,
            ErrorReply::Data => Tag::ERRD,
            ErrorReply::Value => Tag::ERRV,
        }
    }
}

/// Total length of a frame carrying `payload_len` payload bytes
pub const fn frame_len(payload_len: usize, scope: ChecksumScope) -> usize {
    let crc = if scope.has_checksum(payload_len) {
        CRC_LEN
    } else {
        0
    };
    TAG_LEN + payload_len + crc
}

/// Encode a frame into `out`
///
/// Returns the number of bytes written.
pub fn encode_frame(
    tag: Tag,
    payload: &[u8],
    scope: ChecksumScope,
    out: &mut [u8],
) -> Result<usize, FrameError> {
    if out.len() < frame_len(payload.len(), scope) {
        return Err(FrameError::BufferTooSmall);
    }
    out[TAG_LEN..TAG_LEN + payload.len()].copy_from_slice(payload);
    seal_frame(tag, payload.len(), scope, out)
}

/// Complete a frame whose payload already sits at `out[TAG_LEN..]`
///
/// Writes the tag in front and the checksum behind the payload. Returns
/// the frame length.
pub fn seal_frame(
    tag: Tag,
    payload_len: usize,
    scope: ChecksumScope,
    out: &mut [u8],
) -> Result<usize, FrameError> {
    let len = frame_len(payload_len, scope);
    if out.len() < len {
        return Err(FrameError::BufferTooSmall);
    }

    let body = TAG_LEN + payload_len;
    out[..TAG_LEN].copy_from_slice(tag.as_bytes());
    if scope.has_checksum(payload_len) {
        let crc = scope.checksum(&tag, &out[TAG_LEN..body]);
        out[body..len].copy_from_slice(&crc.to_le_bytes());
    }

    Ok(len)
}

/// Validate a complete frame and split it into tag and payload
///
/// `frame` must be exactly one frame: the payload length is implied by its
/// length and `scope`.
pub fn verify_frame(frame: &[u8], scope: ChecksumScope) -> Result<(Tag, &[u8]), FrameError> {
    let tag = Tag::from_slice(frame).ok_or(FrameError::Truncated)?;

    if frame.len() == TAG_LEN && !scope.has_checksum(0) {
        return Ok((tag, &frame[TAG_LEN..]));
    }

    if frame.len() < TAG_LEN + CRC_LEN {
        return Err(FrameError::Truncated);
    }

    let body = frame.len() - CRC_LEN;
    let payload = &frame[TAG_LEN..body];
    let found = u16::from_le_bytes([frame[body], frame[body + 1]]);
    if found != scope.checksum(&tag, payload) {
        return Err(FrameError::ChecksumMismatch);
    }

    Ok((tag, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::{crc16, CRC16_SEED};

    #[test]
    fn test_encode_tag_and_payload() {
        let mut buffer = [0u8; 16];
        let len = encode_frame(
            Tag::from_ascii(b"movr"),
            &[0xC8, 0, 0, 0],
            ChecksumScope::TagAndPayload,
            &mut buffer,
        )
        .unwrap();

        assert_eq!(len, 10);
        assert_eq!(&buffer[..4], b"movr");
        assert_eq!(&buffer[4..8], &[0xC8, 0, 0, 0]);
        let crc = crc16(&buffer[..8], CRC16_SEED);
        assert_eq!(&buffer[8..10], &crc.to_le_bytes());
    }

    #[test]
    fn test_encode_payload_only_empty_has_no_checksum() {
        let mut buffer = [0u8; 8];
        let len = encode_frame(
            Tag::from_ascii(b"home"),
            &[],
            ChecksumScope::PayloadOnly,
            &mut buffer,
        )
        .unwrap();

        assert_eq!(len, 4);
        assert_eq!(&buffer[..4], b"home");
    }

    #[test]
    fn test_payload_only_checksum_skips_tag() {
        let mut buffer = [0u8; 8];
        encode_frame(
            Tag::from_ascii(b"sset"),
            &[7, 9],
            ChecksumScope::PayloadOnly,
            &mut buffer,
        )
        .unwrap();

        let crc = crc16(&[7, 9], CRC16_SEED);
        assert_eq!(&buffer[6..8], &crc.to_le_bytes());
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let mut buffer = [0u8; 5];
        let result = encode_frame(
            Tag::from_ascii(b"gpos"),
            &[],
            ChecksumScope::TagAndPayload,
            &mut buffer,
        );
        assert_eq!(result, Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_verify_roundtrip() {
        let mut buffer = [0u8; 16];
        let len = encode_frame(
            Tag::from_ascii(b"gpos"),
            &[1, 2, 3],
            ChecksumScope::TagAndPayload,
            &mut buffer,
        )
        .unwrap();

        let (tag, payload) = verify_frame(&buffer[..len], ChecksumScope::TagAndPayload).unwrap();
        assert_eq!(tag, Tag::from_ascii(b"gpos"));
        assert_eq!(payload, &[1, 2, 3]);
    }

    #[test]
    fn test_verify_rejects_flipped_checksum() {
        let mut buffer = [0u8; 16];
        let len = encode_frame(
            Tag::from_ascii(b"gpos"),
            &[1, 2, 3],
            ChecksumScope::TagAndPayload,
            &mut buffer,
        )
        .unwrap();
        buffer[len - 1] ^= 0xFF;

        let result = verify_frame(&buffer[..len], ChecksumScope::TagAndPayload);
        assert_eq!(result, Err(FrameError::ChecksumMismatch));
    }

    #[test]
    fn test_verify_truncated() {
        assert_eq!(
            verify_frame(b"gpo", ChecksumScope::TagAndPayload),
            Err(FrameError::Truncated)
        );
        assert_eq!(
            verify_frame(b"gpos", ChecksumScope::TagAndPayload),
            Err(FrameError::Truncated)
        );
        assert!(verify_frame(b"gpos", ChecksumScope::PayloadOnly).is_ok());
    }

    #[test]
    fn test_seal_in_place() {
        let mut buffer = [0u8; 12];
        buffer[4..7].copy_from_slice(&[9, 8, 7]);
        let len = seal_frame(
            Tag::from_ascii(b"gpos"),
            3,
            ChecksumScope::TagAndPayload,
            &mut buffer,
        )
        .unwrap();

        let mut expected = [0u8; 12];
        encode_frame(
            Tag::from_ascii(b"gpos"),
            &[9, 8, 7],
            ChecksumScope::TagAndPayload,
            &mut expected,
        )
        .unwrap();
        assert_eq!(&buffer[..len], &expected[..len]);
    }

    #[test]
    fn test_frame_len() {
        assert_eq!(frame_len(0, ChecksumScope::TagAndPayload), 6);
        assert_eq!(frame_len(0, ChecksumScope::PayloadOnly), 4);
        assert_eq!(frame_len(10, ChecksumScope::PayloadOnly), 16);
    }

    #[test]
    fn test_tag_code_is_little_endian() {
        // "errc" is documented as 0x63727265
        assert_eq!(Tag::ERRC.code(), 0x6372_7265);
        assert_eq!(Tag::from(0x6472_7265), Tag::ERRD);
        assert!(Tag::ERRV.is_error_reply());
        assert!(!Tag::from_ascii(b"gpos").is_error_reply());
    }

    #[test]
    fn test_tag_debug() {
        assert_eq!(format!("{:?}", Tag::from_ascii(b"home")), "Tag(\"home\")");
        assert_eq!(format!("{:?}", Tag::new([0, 1, 2, 3])), "Tag(0x03020100)");
    }
}
