//! Decoding of raw retransmission records.
//!
//! The kernel-side program emits one fixed-layout record per retransmitted
//! segment. All multi-byte integers are little-endian and the struct is
//! packed, so field offsets are fixed.

use thiserror::Error;

/// Address family code for IPv4 (AF_INET).
pub const AF_INET: u16 = 2;

/// Address family code for IPv6 (AF_INET6).
pub const AF_INET6: u16 = 10;

/// Size in bytes of the on-wire event record.
pub const EVENT_SIZE: usize = 62;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("record too short: {len} bytes, expected {expected}")]
    ShortBuffer { len: usize, expected: usize },
}

/// Address family of a decoded event. Determines which address fields carry
/// meaningful data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
    Unknown(u16),
}

impl AddressFamily {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            AF_INET => Self::V4,
            AF_INET6 => Self::V6,
            other => Self::Unknown(other),
        }
    }
}

/// A single decoded TCP retransmission event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetransmitEvent {
    /// Nanoseconds since the epoch, kernel clock domain.
    pub timestamp: u64,
    /// Process owning the socket at the time of retransmission, 0 if unknown.
    pub pid: u32,
    pub sport: u16,
    pub dport: u16,
    pub family: AddressFamily,
    pub saddr: [u8; 4],
    pub daddr: [u8; 4],
    pub saddr_v6: [u8; 16],
    pub daddr_v6: [u8; 16],
    /// Kernel TCP state code, passed through without interpretation.
    pub state: i32,
}

/// Decode a raw record into a [`RetransmitEvent`].
///
/// Records longer than [`EVENT_SIZE`] are accepted and the trailing bytes
/// ignored, since perf records carry alignment padding. Records with an
/// unknown address family still decode successfully.
pub fn decode(raw: &[u8]) -> Result<RetransmitEvent, DecodeError> {
    if raw.len() < EVENT_SIZE {
        return Err(DecodeError::ShortBuffer {
            len: raw.len(),
            expected: EVENT_SIZE,
        });
    }

    Ok(RetransmitEvent {
        timestamp: read_u64_le(raw, 0),
        pid: read_u32_le(raw, 8),
        sport: read_u16_le(raw, 12),
        dport: read_u16_le(raw, 14),
        saddr: read_bytes(raw, 16),
        daddr: read_bytes(raw, 20),
        saddr_v6: read_bytes(raw, 24),
        daddr_v6: read_bytes(raw, 40),
        family: AddressFamily::from_raw(read_u16_le(raw, 56)),
        state: read_u32_le(raw, 58) as i32,
    })
}

// Offsets are validated by the length check at decode entry.

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn read_u64_le(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

fn read_bytes<const N: usize>(data: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&data[offset..offset + N]);
    out
}
