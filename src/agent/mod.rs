//! Agent orchestration: resource setup, the ingestion loop, and cooperative
//! shutdown.
//!
//! Ingestion is a single sequential path: decode, resolve, increment, and
//! journal run as one synchronous unit per record, in delivery order.
//! Metrics scrapes run concurrently on a small async runtime and share
//! nothing with ingestion beyond the counter store's internal locking.

pub mod event;
pub mod exposition;
pub mod journal;
pub mod labels;
pub mod store;
pub mod transport;

#[cfg(target_os = "linux")]
mod bpf;

#[cfg(test)]
mod testing;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use labels::LabelKey;
use store::CounterStore;
use transport::{Poll, Transport};

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Run the agent until it is interrupted or the transport fails.
pub fn run(config: Arc<Config>) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));

    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::Relaxed);
        })
        .context("failed to install signal handler")?;
    }

    #[cfg(target_os = "linux")]
    {
        let transport = bpf::PerfTransport::open(&config)?;
        serve_and_ingest(&config, transport, &shutdown)
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = (&config, &shutdown);
        Err(anyhow::anyhow!(
            "the BPF event transport is only supported on linux"
        ))
    }
}

/// Bring up the metrics endpoint, then drive ingestion on the current
/// thread. The endpoint keeps serving last-known values for as long as the
/// process lives, regardless of ingestion faults.
fn serve_and_ingest<T: Transport>(
    config: &Config,
    mut transport: T,
    shutdown: &AtomicBool,
) -> Result<()> {
    let listen = config.general().listen()?;
    let store = Arc::new(CounterStore::new());

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(1)
        .thread_name("rexmit")
        .build()
        .context("failed to launch async runtime")?;

    // bind before ingesting so a port conflict aborts startup
    let listener = rt
        .block_on(tokio::net::TcpListener::bind(listen))
        .with_context(|| format!("failed to bind metrics listener: {listen}"))?;

    info!("serving metrics on http://{listen}/metrics");

    rt.spawn(exposition::serve(listener, store.clone()));

    info!("monitoring TCP retransmissions");

    let result = ingest(&mut transport, &store, shutdown);

    // release the exporter and the transport on every exit path
    drop(transport);
    rt.shutdown_background();

    result
}

/// Consume records until shutdown or a fatal transport error. A record that
/// has started processing always runs to completion; the shutdown flag is
/// only observed between records.
pub fn ingest<T: Transport>(
    transport: &mut T,
    store: &CounterStore,
    shutdown: &AtomicBool,
) -> Result<()> {
    while !shutdown.load(Ordering::Relaxed) {
        match transport.poll(POLL_TIMEOUT) {
            Ok(Poll::Record(raw)) => match event::decode(&raw) {
                Ok(event) => {
                    let key = LabelKey::from_event(&event);
                    journal::write(&event, &key);
                    store.increment(key);
                }
                // a malformed record is skipped, never fatal: the export
                // path must stay live
                Err(e) => warn!("skipping record: {e}"),
            },
            Ok(Poll::Empty) => continue,
            Err(e) => return Err(e).context("event transport failed"),
        }
    }

    info!("received shutdown signal, stopping");

    Ok(())
}
