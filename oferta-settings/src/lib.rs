#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! # Oferta Settings
//!
//! Configuration is specified in several ways, with later methods overriding
//! earlier ones.
//!
//! 1. A base configuration checked into the repository, in `config/base.yaml`.
//!    This provides the default values for most settings.
//! 2. Per-environment configuration files in the `config` directory. The
//!    environment is selected using the environment variable `OFERTA_ENV`. The
//!    settings for that environment are then loaded from `config/${env}.yaml`,
//!    if it exists. The default environment is "development". A "production"
//!    environment is also provided.
//! 3. A local configuration file not checked into the repository, at
//!    `config/local.yaml`. This file is in `.gitignore` and is safe to use for
//!    local configuration and secrets if desired.
//! 4. Environment variables that begin with `OFERTA_` and use `__` as a level
//!    separator. For example, `Settings::http::workers` can be controlled from
//!    the environment variable `OFERTA_HTTP__WORKERS`.
//!
//! Tests should use `Settings::load_for_tests` which only reads from
//! `config/base.yaml`, `config/test.yaml`, and `config/local_test.yaml` (if it
//! exists). It does not read from environment variables.
//!
//! Configuration files are canonically YAML files. However, any format
//! supported by the [config] crate can be used, including JSON and TOML. To
//! choose another format, simply use a different extension for your file, like
//! `config/local.toml`.

mod logging;
mod sources;

pub use logging::{LogFormat, LoggingSettings};
pub use sources::{
    CandidateSourceConfig, ClickHouseCompression, ClickHouseConfig, CustomerOfferRow, MemoryConfig,
    PriorityOfferRow, ProfileOfferRow, TableFamily,
};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::net::SocketAddr;

/// Top level settings object for the offer service.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    /// The environment the service is running in. Should only be set with the
    /// `OFERTA_ENV` environment variable.
    pub env: String,

    /// Enable additional features to debug the application. This should not be
    /// set to true in production environments.
    pub debug: bool,

    /// If on, the full incoming request, including the customer's phone
    /// number, is included in request logs. Do not turn this on in production,
    /// the phone number is personal data.
    pub log_full_request: bool,

    /// Settings for the HTTP server.
    pub http: HttpSettings,

    /// The candidate source that offer lookups are answered from.
    pub source: CandidateSourceConfig,

    /// Logging settings.
    pub logging: LoggingSettings,

    /// Settings for metrics reporting.
    pub metrics: MetricsSettings,

    /// Settings for error reporting via Sentry.
    pub sentry: SentrySettings,

    /// URL of the service's public documentation, linked from the index page.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub public_documentation: Option<http::Uri>,
}

/// Settings for the HTTP server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpSettings {
    /// The host and port to listen on, such as "127.0.0.1:8080" or "0.0.0.0:80".
    pub listen: SocketAddr,

    /// The number of workers to use. Optional. If no value is provided, the
    /// number of logical cores will be used.
    pub workers: Option<usize>,
}

/// Settings for metrics reporting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// The host to send statsd metrics to.
    pub sink_host: String,

    /// The port to send statsd metrics to.
    pub sink_port: u16,

    /// The approximate maximum amount of memory, in kibibytes, used to queue
    /// metrics that have not been sent yet. Metrics are dropped once the queue
    /// is full.
    pub max_queue_size_kb: usize,
}

/// Settings for error reporting via Sentry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SentrySettings {
    /// Report errors to a Sentry server. The mode for production-like
    /// environments.
    Release {
        /// The DSN of the Sentry project to report to.
        dsn: String,
    },
    /// Log detailed information about events that would be reported, without
    /// requiring a Sentry server. The mode for development environments.
    Debug {
        /// Optionally, a DSN to also deliver events to.
        #[serde(default)]
        dsn: Option<String>,
    },
    /// Don't report errors to Sentry at all.
    Disabled,
}

impl SentrySettings {
    /// Get the configured DSN, if there is one.
    pub fn dsn(&self) -> Option<&str> {
        match self {
            Self::Release { dsn } => Some(dsn),
            Self::Debug { dsn } => dsn.as_deref(),
            Self::Disabled => None,
        }
    }

    /// Check if the Sentry client should run in debug mode.
    pub fn debug(&self) -> bool {
        matches!(self, Self::Debug { .. })
    }
}

impl Settings {
    /// Load settings from configuration files and environment variables.
    ///
    /// # Errors
    /// If any of the configured values are invalid, or if any of the required
    /// configuration files are missing.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("OFERTA_ENV").unwrap_or_else(|_| "development".to_string());

        Config::builder()
            // Start off with the base config.
            .add_source(File::with_name("./config/base"))
            // Merge in an environment specific config.
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Add a local configuration file that is `.gitignore`ed.
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables that start with "OFERTA_" and have
            // "__" to separate levels. For example, `OFERTA_HTTP__LISTEN` maps
            // to `Settings::http::listen`.
            .add_source(Environment::with_prefix("OFERTA").separator("__"))
            .set_override("env", env)?
            .build()?
            .try_deserialize()
    }

    /// Load settings from configuration files for tests.
    ///
    /// `changer` runs after the files are loaded, and can adjust any setting
    /// before the harness acts on them.
    pub fn load_for_tests<F: FnOnce(&mut Self)>(changer: F) -> Self {
        let mut settings: Self = Config::builder()
            // Start off with the base config.
            .add_source(File::with_name("../config/base"))
            // Merge in test specific config.
            .add_source(File::with_name("../config/test"))
            // Add a local configuration file that is `.gitignore`ed.
            .add_source(File::with_name("../config/local_test").required(false))
            .set_override("env", "test")
            .expect("Could not set env for tests")
            .build()
            .expect("Could not load settings for tests")
            .try_deserialize()
            .expect("Could not convert settings");

        changer(&mut settings);
        settings
    }
}
