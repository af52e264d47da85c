//! # Developer documentation for working on Oferta
//!
//! ## tl;dr
//!
//! Here are some useful commands when working on Oferta.
//!
//! Run the main app
//! ```shell
//! $ cargo run -p oferta
//! ```
//!
//! Run all tests
//! ```shell
//! $ cargo test
//! ```
//!
//! Run specific integration tests
//! ```shell
//! $ cargo test -p oferta-integration-tests -- offers
//! ```
//!
//! ## Configuration
//!
//! Settings are loaded from the YAML files in `config/`, starting from
//! `config/base.yaml`, layering `config/<env>.yaml` on top of it, and finally
//! `config/local.yaml`, which is gitignored and meant for personal overrides.
//! The environment is chosen with `OFERTA_ENV`, and defaults to `development`.
//!
//! Every setting can also be overridden with an environment variable prefixed
//! with `OFERTA_`, using `__` to separate nesting levels. For example, the
//! ClickHouse password is usually injected as
//! `OFERTA_SOURCE__PASSWORD=hunter2`.
//!
//! Log verbosity is driven by the `logging.levels` setting, and can be
//! overridden at runtime with the standard `RUST_LOG` variable.
//!
//! ## Dependencies
//!
//! In production the candidate source is ClickHouse. The development
//! configuration uses the in-memory source instead, seeded with a few demo
//! rows, so no extra services are needed to work on the service itself.
//!
//! To exercise the ClickHouse source locally, run a server with Docker
//!
//! ```shell
//! $ docker run -p 8123:8123 clickhouse/clickhouse-server
//! ```
//!
//! and switch the source in `config/local.yaml`:
//!
//! ```yaml
//! source:
//!   type: clickhouse
//!   url: http://localhost:8123
//!   user: default
//!   password: ""
//!   tables: general
//! ```
