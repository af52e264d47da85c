//! Tools for generating a statsd client from the application settings.

use anyhow::{Context, Result};
use cadence::{BufferedUdpMetricSink, QueuingMetricSink, StatsdClient};
use oferta_settings::Settings;
use std::net::UdpSocket;

/// Create a statsd client that sends metrics over UDP in a background thread.
///
/// The queue in front of the sink is bounded. If the sink cannot keep up, new
/// metrics are dropped instead of blocking request handling.
pub fn build_metrics_client(settings: &Settings) -> Result<StatsdClient> {
    let socket = UdpSocket::bind("0.0.0.0:0").context("Binding metrics socket")?;
    socket
        .set_nonblocking(true)
        .context("Setting metrics socket to nonblocking")?;

    let host = (
        settings.metrics.sink_host.as_str(),
        settings.metrics.sink_port,
    );
    let udp_sink = BufferedUdpMetricSink::from(host, socket).context("Building metrics sink")?;
    let queuing_sink =
        QueuingMetricSink::with_capacity(udp_sink, settings.metrics.max_queue_size_kb * 1024);

    Ok(StatsdClient::from_sink("oferta", queuing_sink))
}
