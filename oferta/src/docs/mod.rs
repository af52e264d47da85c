//! Documentation for Oferta as a whole.
//!
//! Only pages that cover the service across crate boundaries live here.
//! Anything specific to a single crate belongs in that crate's own docs.

pub mod adrs;
pub mod api;
pub mod dev;
pub mod overview;
pub mod testing;
