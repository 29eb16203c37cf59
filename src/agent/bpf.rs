//! Perf ring buffer transport backed by a pre-built BPF object.
//!
//! The kernel side is an external artifact: a program attached to the
//! `tcp:tcp_retransmit_skb` tracepoint that publishes one fixed-layout
//! record per retransmitted segment through a perf event array map. This
//! module loads and attaches that artifact, then polls the perf buffer on a
//! dedicated thread, handing records to the ingestion path through a bounded
//! channel.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use libbpf_rs::{MapCore as _, ObjectBuilder, PerfBufferBuilder, TracepointCategory};
use tracing::{debug, error, warn};

use super::transport::{Poll, Transport, TransportError};
use crate::config::Config;

const PROG_NAME: &str = "tracepoint__tcp__tcp_retransmit_skb";
const MAP_NAME: &str = "events";

const TRACEPOINT_CATEGORY: &str = "tcp";
const TRACEPOINT_NAME: &str = "tcp_retransmit_skb";

/// Records buffered between the perf poll thread and the ingestion loop.
/// Overflow is dropped, same as kernel-side drops: there is no replay.
const CHANNEL_DEPTH: usize = 4096;

const PERF_POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub struct PerfTransport {
    records: Receiver<Vec<u8>>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PerfTransport {
    /// Load the BPF object, attach the tracepoint, and start polling.
    ///
    /// Any setup failure is reported here, before a single record is
    /// delivered, so startup can abort loudly.
    pub fn open(config: &Config) -> Result<Self> {
        let object_path = config.general().bpf_object().to_path_buf();

        let (record_tx, record_rx) = sync_channel(CHANNEL_DEPTH);
        let (ready_tx, ready_rx) = sync_channel(1);

        let stop = Arc::new(AtomicBool::new(false));

        let thread = std::thread::Builder::new()
            .name("rexmit-bpf".to_string())
            .spawn({
                let stop = stop.clone();
                move || poll_loop(&object_path, record_tx, &ready_tx, &stop)
            })
            .context("failed to spawn BPF poll thread")?;

        ready_rx
            .recv()
            .map_err(|_| anyhow!("BPF poll thread exited during setup"))??;

        Ok(Self {
            records: record_rx,
            stop,
            thread: Some(thread),
        })
    }
}

impl Transport for PerfTransport {
    fn poll(&mut self, timeout: Duration) -> Result<Poll, TransportError> {
        match self.records.recv_timeout(timeout) {
            Ok(raw) => Ok(Poll::Record(raw)),
            Err(RecvTimeoutError::Timeout) => Ok(Poll::Empty),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }
}

impl Drop for PerfTransport {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);

        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Owns the BPF object, link, and perf buffer for the lifetime of the poll
/// loop. Everything is released when this returns.
fn poll_loop(
    object_path: &Path,
    records: SyncSender<Vec<u8>>,
    ready: &SyncSender<Result<()>>,
    stop: &AtomicBool,
) {
    macro_rules! setup {
        ($result:expr) => {
            match $result {
                Ok(v) => v,
                Err(e) => {
                    let _ = ready.send(Err(e));
                    return;
                }
            }
        };
    }

    let mut object = setup!(open_object(object_path));

    let _link = {
        let prog = object
            .progs_mut()
            .find(|p| p.name().to_str() == Some(PROG_NAME));

        let Some(mut prog) = prog else {
            let _ = ready.send(Err(anyhow!("program '{PROG_NAME}' not found in BPF object")));
            return;
        };

        setup!(prog
            .attach_tracepoint(TracepointCategory::Tcp, TRACEPOINT_NAME)
            .with_context(|| format!(
                "failed to attach {TRACEPOINT_CATEGORY}:{TRACEPOINT_NAME}"
            )))
    };

    let map = setup!(object
        .maps()
        .find(|m| m.name().to_str() == Some(MAP_NAME))
        .ok_or_else(|| anyhow!("map '{MAP_NAME}' not found in BPF object")));

    let perf = setup!(PerfBufferBuilder::new(&map)
        .sample_cb(move |_cpu: i32, data: &[u8]| {
            match records.try_send(data.to_vec()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("record channel full, dropping event");
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        })
        .lost_cb(|cpu: i32, count: u64| {
            warn!("lost {count} events on cpu {cpu}");
        })
        .build()
        .context("failed to open perf buffer"));

    let _ = ready.send(Ok(()));
    debug!("perf transport ready: {}", object_path.display());

    while !stop.load(Ordering::Relaxed) {
        if let Err(e) = perf.poll(PERF_POLL_TIMEOUT) {
            if e.kind() == libbpf_rs::ErrorKind::Interrupted {
                continue;
            }

            // dropping the sender surfaces this to the ingestion loop as a
            // fatal transport fault
            error!("perf buffer poll failed: {e}");
            break;
        }
    }
}

fn open_object(path: &Path) -> Result<libbpf_rs::Object> {
    if !path.exists() {
        return Err(anyhow!("BPF object not found: {}", path.display()));
    }

    let open = ObjectBuilder::default()
        .open_file(path)
        .with_context(|| format!("failed to open BPF object: {}", path.display()))?;

    open.load()
        .with_context(|| format!("failed to load BPF object: {}", path.display()))
}
