//! Architectural Decision Records for Oferta.

pub mod adr_0001_tier_precedence;
