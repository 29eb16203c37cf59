//! Builders for raw on-wire event records, used by unit tests.

use super::event::{AF_INET, AF_INET6, EVENT_SIZE};

/// Field-by-field builder for a raw record. Encodes with the packed
/// little-endian layout the decoder expects.
pub struct RawRecordBuilder {
    pub timestamp: u64,
    pub pid: u32,
    pub sport: u16,
    pub dport: u16,
    pub saddr: [u8; 4],
    pub daddr: [u8; 4],
    pub saddr_v6: [u8; 16],
    pub daddr_v6: [u8; 16],
    pub family: u16,
    pub state: i32,
}

impl Default for RawRecordBuilder {
    fn default() -> Self {
        Self {
            timestamp: 0,
            pid: 0,
            sport: 0,
            dport: 0,
            saddr: [0; 4],
            daddr: [0; 4],
            saddr_v6: [0; 16],
            daddr_v6: [0; 16],
            family: AF_INET,
            state: 0,
        }
    }
}

impl RawRecordBuilder {
    pub fn build(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(EVENT_SIZE);
        raw.extend_from_slice(&self.timestamp.to_le_bytes());
        raw.extend_from_slice(&self.pid.to_le_bytes());
        raw.extend_from_slice(&self.sport.to_le_bytes());
        raw.extend_from_slice(&self.dport.to_le_bytes());
        raw.extend_from_slice(&self.saddr);
        raw.extend_from_slice(&self.daddr);
        raw.extend_from_slice(&self.saddr_v6);
        raw.extend_from_slice(&self.daddr_v6);
        raw.extend_from_slice(&self.family.to_le_bytes());
        raw.extend_from_slice(&self.state.to_le_bytes());
        debug_assert_eq!(raw.len(), EVENT_SIZE);
        raw
    }
}

pub fn raw_v4(
    timestamp: u64,
    pid: u32,
    sport: u16,
    dport: u16,
    saddr: [u8; 4],
    daddr: [u8; 4],
    state: i32,
) -> Vec<u8> {
    RawRecordBuilder {
        timestamp,
        pid,
        sport,
        dport,
        saddr,
        daddr,
        family: AF_INET,
        state,
        ..Default::default()
    }
    .build()
}

pub fn raw_v6(
    timestamp: u64,
    pid: u32,
    sport: u16,
    dport: u16,
    saddr_v6: [u8; 16],
    daddr_v6: [u8; 16],
    state: i32,
) -> Vec<u8> {
    RawRecordBuilder {
        timestamp,
        pid,
        sport,
        dport,
        saddr_v6,
        daddr_v6,
        family: AF_INET6,
        state,
        ..Default::default()
    }
    .build()
}
