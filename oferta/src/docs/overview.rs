//! # High level overview of Oferta
//!
//! This project is structured as a [Cargo Workspace][] that contains one crate
//! for each broad area of behavior of the service. This structure is
//! advantageous because the crates can be handled either individually or as a
//! group. When compiling, each crate can be compiled in parallel, where
//! dependencies allow, and when running tests, each test suite can be run
//! separately or together.
//!
//! [Cargo Workspace]: https://doc.rust-lang.org/book/ch14-03-cargo-workspaces.html
//!
//! This is a brief overview of the crates found in the repository. For more
//! details, see the specific crate docs.
//!
//! ## [`oferta`](../)
//!
//! This is the main application, and the *binary* crate in the repository. It
//! brings together and configures the other crates to create a production-like
//! environment for offer ranking.
//!
//! ## [`oferta-settings`](../../oferta_settings/index.html)
//!
//! This defines and documents the settings of the application. These settings
//! should be initialized by one of the *binary* crates, and passed into the
//! other crates to configure them.
//!
//! ## [`oferta-web`](../../oferta_web/index.html)
//!
//! This crate provides the HTTP API of the service, including providing
//! observability into the running of the application via that API.
//!
//! ## [`oferta-ranking`](../../oferta_ranking/index.html)
//!
//! This is a *domain* crate that defines the data model and traits needed to
//! rank offers for a customer, along with the ranking algorithm itself and an
//! in-memory candidate source used in development and tests.
//!
//! ## [`oferta-clickhouse`](../../oferta_clickhouse/index.html)
//!
//! This crate provides the ClickHouse-backed candidate source used in
//! production, implementing the traits from `oferta-ranking`.
//!
//! ## [`oferta-integration-tests`](../../oferta_integration_tests/index.html)
//!
//! This crate is a separate test system. It works much like `oferta`, in that
//! it brings together the other crates to produce a complete environment.
//! However, the application it produces exercises the service as a whole,
//! instead of providing a server to manually test against.
