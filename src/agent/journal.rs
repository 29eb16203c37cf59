//! Per-event journal: one JSON object per processed event, written to
//! stdout. The field names and shape are a stable interface for log
//! consumers; diagnostics go to stderr via tracing instead.

use serde::Serialize;

use super::event::RetransmitEvent;
use super::labels::LabelKey;

#[derive(Serialize)]
struct Endpoint<'a> {
    ip: &'a str,
    port: u16,
}

#[derive(Serialize)]
struct EventRecord<'a> {
    timestamp: String,
    pid: u32,
    state: i32,
    ipversion: u8,
    source: Endpoint<'a>,
    destination: Endpoint<'a>,
}

/// Render the journal line for one event.
pub fn render(event: &RetransmitEvent, key: &LabelKey) -> String {
    let timestamp = chrono::DateTime::from_timestamp_nanos(event.timestamp as i64)
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    let record = EventRecord {
        timestamp,
        pid: event.pid,
        state: event.state,
        ipversion: key.ip_version,
        source: Endpoint {
            ip: &key.src_ip,
            port: event.sport,
        },
        destination: Endpoint {
            ip: &key.dst_ip,
            port: event.dport,
        },
    };

    // serialization of a flat struct with string/int fields cannot fail
    serde_json::to_string(&record).unwrap_or_default()
}

pub fn write(event: &RetransmitEvent, key: &LabelKey) {
    println!("{}", render(event, key));
}
