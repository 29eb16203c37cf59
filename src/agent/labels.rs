//! Connection identity resolution.
//!
//! Maps a decoded event onto the label tuple that identifies its counter
//! series. Resolution is total: every event yields a key, including events
//! with an address family we do not understand.

use super::event::{AddressFamily, RetransmitEvent};

/// The label tuple identifying one counter series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelKey {
    /// 4, 6, or 0 for an unknown address family.
    pub ip_version: u8,
    pub src_ip: String,
    pub src_port: String,
    pub dst_ip: String,
    pub dst_port: String,
}

impl LabelKey {
    pub fn from_event(event: &RetransmitEvent) -> Self {
        let (ip_version, src_ip, dst_ip) = match event.family {
            AddressFamily::V4 => (4, format_v4(&event.saddr), format_v4(&event.daddr)),
            AddressFamily::V6 => (6, format_v6(&event.saddr_v6), format_v6(&event.daddr_v6)),
            AddressFamily::Unknown(_) => (0, String::new(), String::new()),
        };

        Self {
            ip_version,
            src_ip,
            src_port: event.sport.to_string(),
            dst_ip,
            dst_port: event.dport.to_string(),
        }
    }
}

fn format_v4(addr: &[u8; 4]) -> String {
    format!("{}.{}.{}.{}", addr[0], addr[1], addr[2], addr[3])
}

/// Fixed hex-pair rendering: eight groups of two zero-padded byte pairs,
/// without RFC 5952 zero-compression. Downstream metric consumers key on
/// this exact form, so it must not be normalized.
fn format_v6(addr: &[u8; 16]) -> String {
    let mut out = String::with_capacity(39);
    for (i, pair) in addr.chunks_exact(2).enumerate() {
        if i > 0 {
            out.push(':');
        }
        out.push_str(&format!("{:02x}{:02x}", pair[0], pair[1]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::event::decode;
    use crate::agent::testing::{raw_v4, raw_v6, RawRecordBuilder};

    #[test]
    fn resolve_ipv4() {
        let raw = raw_v4(0, 0, 443, 5000, [192, 168, 1, 10], [10, 0, 0, 2], 1);
        let key = LabelKey::from_event(&decode(&raw).unwrap());

        assert_eq!(key.ip_version, 4);
        assert_eq!(key.src_ip, "192.168.1.10");
        assert_eq!(key.src_port, "443");
        assert_eq!(key.dst_ip, "10.0.0.2");
        assert_eq!(key.dst_port, "5000");
    }

    #[test]
    fn resolve_ipv6_keeps_uncompressed_rendering() {
        let mut src = [0u8; 16];
        src[0] = 0xfe;
        src[1] = 0x80;
        src[15] = 0x01;

        let raw = raw_v6(0, 0, 1, 2, src, [0u8; 16], 0);
        let key = LabelKey::from_event(&decode(&raw).unwrap());

        assert_eq!(key.ip_version, 6);
        assert_eq!(key.src_ip, "fe80:0000:0000:0000:0000:0000:0000:0001");
        assert_eq!(key.dst_ip, "0000:0000:0000:0000:0000:0000:0000:0000");
    }

    #[test]
    fn resolve_unknown_family() {
        let raw = RawRecordBuilder {
            sport: 7,
            dport: 8,
            family: 1,
            ..Default::default()
        }
        .build();

        let key = LabelKey::from_event(&decode(&raw).unwrap());

        assert_eq!(key.ip_version, 0);
        assert_eq!(key.src_ip, "");
        assert_eq!(key.dst_ip, "");
        assert_eq!(key.src_port, "7");
        assert_eq!(key.dst_port, "8");
    }

    #[test]
    fn keys_are_structural() {
        let raw = raw_v4(1, 2, 3, 4, [1, 1, 1, 1], [2, 2, 2, 2], 0);
        // different timestamp and pid, same connection identity
        let other = raw_v4(9, 9, 3, 4, [1, 1, 1, 1], [2, 2, 2, 2], 3);

        assert_eq!(
            LabelKey::from_event(&decode(&raw).unwrap()),
            LabelKey::from_event(&decode(&other).unwrap())
        );
    }
}
