// Only overview documentation that is not relevant to one of the more specific
// crates should go here.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! A web API that ranks promotional offers for retail campaign sites.
//!
//! Oferta is split into several subcrates that work in collaboration.
//!
//! - [oferta-clickhouse](../oferta_clickhouse/index.html)
//! - [oferta-integration-tests](../oferta_integration_tests/index.html)
//! - [oferta-ranking](../oferta_ranking/index.html)
//! - [oferta-settings](../oferta_settings/index.html)
//! - [oferta-web](../oferta_web/index.html)

mod docs;
mod metrics;
mod sentry;

use anyhow::{Context, Result};
use oferta_settings::{LogFormat, Settings};
use std::net::TcpListener;
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

/// Primary entry point
#[actix_rt::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("Loading settings")?;
    init_logging(&settings)?;
    let _sentry_guard = sentry::init_sentry(&settings).context("Initializing Sentry")?;
    let metrics_client =
        metrics::build_metrics_client(&settings).context("Building metrics client")?;
    let listener = TcpListener::bind(settings.http.listen).context("Binding port")?;

    oferta_web::run(listener, metrics_client, settings)
        .context("Starting oferta-web server")?
        .await
        .context("Running oferta-web server")?;

    Ok(())
}

/// Set up logging, based on settings and the `RUST_LOG` environment variable.
fn init_logging(settings: &Settings) -> Result<()> {
    LogTracer::init()?;
    let env_filter: EnvFilter = (&settings.logging.levels).into();

    // The formatters have distinct types, so each arm finishes and installs
    // its own subscriber.
    match settings.logging.format {
        LogFormat::Pretty => {
            let subscriber = tracing_subscriber::fmt::Subscriber::builder()
                .pretty()
                .finish()
                .with(env_filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::fmt::Subscriber::builder()
                .compact()
                .finish()
                .with(env_filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::fmt::Subscriber::builder()
                .json()
                .finish()
                .with(env_filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}
