#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! # Oferta Ranking
//!
//! The domain types of the offer service, the [`CandidateSource`] trait that
//! backends implement, and the [`OfferRanker`] that merges a source's
//! candidate tiers into the final ranked list.

mod bracket;
mod memory;
mod ranker;
mod request;

pub use bracket::{AgeBracket, ParseAgeBracketError};
pub use memory::MemorySource;
pub use ranker::OfferRanker;
pub use request::{normalize_phone, parse_birth_date, RankingRequest, UNSET_BIRTH_DATE};

use async_trait::async_trait;
use fake::{faker::lorem::en::Word, Fake};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A candidate offer, as returned by one tier of a [`CandidateSource`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferCandidate {
    /// Ordering key of the candidate within its tier. Lower sorts first, ties
    /// keep the order the source returned them in.
    pub order: u32,

    /// Identifier of the offer in the offer platform.
    pub offer_id: String,
}

impl OfferCandidate {
    /// Convenience constructor.
    pub fn new(order: u32, offer_id: impl Into<String>) -> Self {
        Self {
            order,
            offer_id: offer_id.into(),
        }
    }
}

impl<F> fake::Dummy<F> for OfferCandidate {
    fn dummy_with_rng<R: rand::Rng + ?Sized>(_config: &F, rng: &mut R) -> Self {
        Self {
            order: rng.gen_range(1..100),
            offer_id: format!("OF-{}", rng.gen_range(1000..10_000)),
        }
    }
}

/// An entry of the final ranked output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedOffer {
    /// Position of the offer in the ranking. Positions are 1-based and
    /// contiguous.
    pub rank: u32,

    /// Identifier of the offer in the offer platform.
    pub offer_id: String,
}

impl<F> fake::Dummy<F> for RankedOffer {
    fn dummy_with_rng<R: rand::Rng + ?Sized>(_config: &F, rng: &mut R) -> Self {
        Self {
            rank: rng.gen_range(1..20),
            offer_id: Word().fake_with_rng(rng),
        }
    }
}

/// Errors that may occur while setting up a candidate source.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// The source cannot be used as configured.
    #[error("This candidate source cannot be used with the current configuration")]
    InvalidConfiguration(#[source] anyhow::Error),
}

/// Errors that may occur while fetching candidates from a source.
#[derive(Debug, thiserror::Error)]
pub enum CandidateError {
    /// The backend failed to answer a candidate query.
    #[error("There was an error querying the candidate source: {0}")]
    Backend(#[source] anyhow::Error),

    /// The backend did not answer within the configured deadline.
    #[error("The candidate source did not answer within the configured deadline")]
    Timeout,
}

/// A backend that can answer the four tiered candidate lookups for a request.
///
/// The tiers are, from most to least specific: offers assigned directly to a
/// customer, offers assigned to a segment the customer belongs to, offers
/// assigned to a demographic profile, and the site-wide defaults.
///
/// None of the lookups return candidates in a meaningful vector order. The
/// per-candidate `order` key establishes ordering within a tier; vector order
/// only breaks ties between equal keys.
///
/// Implementations must honor the exclusion sets exactly. An offer id in
/// `excluded` never appears in the returned candidates, so that lower tiers
/// cannot echo offers that a more specific tier already produced.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// An operator-visible name for this source, used in logs.
    fn name(&self) -> String;

    /// Offers assigned to this exact customer, for this campaign and site.
    async fn direct_matches(
        &self,
        campaign_id: &str,
        phone: &str,
        site_id: i64,
    ) -> Result<Vec<OfferCandidate>, CandidateError>;

    /// Offers assigned to a segment containing this customer, for this
    /// campaign and site.
    async fn segment_matches(
        &self,
        campaign_id: &str,
        phone: &str,
        site_id: i64,
        excluded: &HashSet<String>,
    ) -> Result<Vec<OfferCandidate>, CandidateError>;

    /// Offers assigned to a demographic profile, for this campaign and site.
    ///
    /// A `gender` or `bracket` of `None` matches only records with no value
    /// recorded for that column, never any record with a value.
    async fn profile_matches(
        &self,
        campaign_id: &str,
        site_id: i64,
        gender: Option<&str>,
        bracket: Option<AgeBracket>,
        excluded: &HashSet<String>,
    ) -> Result<Vec<OfferCandidate>, CandidateError>;

    /// The site-wide default offers. The `order` key of each candidate is the
    /// offer's priority among the defaults.
    async fn priority_defaults(
        &self,
        site_id: i64,
        excluded: &HashSet<String>,
    ) -> Result<Vec<OfferCandidate>, CandidateError>;
}
