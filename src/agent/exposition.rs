//! HTTP exposition of the counter store in Prometheus text format.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, decompression::RequestDecompressionLayer};
use tracing::error;

use super::store::CounterStore;

const COUNTER_NAME: &str = "tcp_retransmissions_total";
const COUNTER_HELP: &str = "Total number of TCP retransmissions";

const SERIES_GAUGE_NAME: &str = "tcp_retransmissions_series";
const SERIES_GAUGE_HELP: &str = "Number of distinct connection label sets observed";

pub async fn serve(listener: TcpListener, store: Arc<CounterStore>) {
    let app = app(store);

    if let Err(e) = axum::serve(listener, app).await {
        error!("metrics server failed: {e}");
    }
}

fn app(store: Arc<CounterStore>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/metrics", get(metrics))
        .with_state(store)
        .layer(
            ServiceBuilder::new()
                .layer(RequestDecompressionLayer::new())
                .layer(CompressionLayer::new()),
        )
}

async fn metrics(State(store): State<Arc<CounterStore>>) -> String {
    render(&store)
}

async fn root() -> String {
    format!("rexmit {}\n", env!("CARGO_PKG_VERSION"))
}

/// Render every counter in Prometheus text format, plus a gauge tracking the
/// label cardinality so runaway key growth is visible to operators.
pub fn render(store: &CounterStore) -> String {
    let mut samples: Vec<String> = store
        .snapshot()
        .into_iter()
        .map(|(key, count)| {
            format!(
                "{COUNTER_NAME}{{ip_version=\"{}\",src_ip=\"{}\",src_port=\"{}\",dst_ip=\"{}\",dst_port=\"{}\"}} {count}",
                key.ip_version, key.src_ip, key.src_port, key.dst_ip, key.dst_port,
            )
        })
        .collect();

    // stable output across scrapes
    samples.sort();

    let mut out = String::new();

    if !samples.is_empty() {
        out.push_str(&format!("# HELP {COUNTER_NAME} {COUNTER_HELP}\n"));
        out.push_str(&format!("# TYPE {COUNTER_NAME} counter\n"));
        for sample in samples {
            out.push_str(&sample);
            out.push('\n');
        }
    }

    out.push_str(&format!("# HELP {SERIES_GAUGE_NAME} {SERIES_GAUGE_HELP}\n"));
    out.push_str(&format!("# TYPE {SERIES_GAUGE_NAME} gauge\n"));
    out.push_str(&format!("{SERIES_GAUGE_NAME} {}\n", store.len()));

    out
}
