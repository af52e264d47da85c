#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! # Oferta ClickHouse
//!
//! The production candidate source. It answers the four tier lookups of
//! [`oferta_ranking::CandidateSource`] by querying the recommendation tables
//! of a ClickHouse deployment over its HTTP interface.

mod source;

pub use source::ClickHouseSource;
