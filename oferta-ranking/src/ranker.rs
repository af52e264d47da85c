//! The tiered merge that produces the final offer ranking.

use crate::{CandidateError, CandidateSource, OfferCandidate, RankedOffer, RankingRequest};
use std::{collections::HashSet, sync::Arc};

/// Ranks offers for requests by merging the candidate tiers of a
/// [`CandidateSource`].
///
/// The four tiers are fetched in dependency order, from most to least
/// specific. Each lookup receives the ids accepted so far as its exclusion
/// set, so a backend can rule those offers out before returning anything.
/// Whatever comes back is still checked against the accepted set here, since
/// a tier can also repeat an offer within itself.
#[derive(Clone)]
pub struct OfferRanker {
    /// The backend that answers the tier lookups.
    source: Arc<dyn CandidateSource>,
}

impl OfferRanker {
    /// Make a ranker backed by the given source.
    pub fn new(source: Arc<dyn CandidateSource>) -> Self {
        Self { source }
    }

    /// The name of the backing source, as used in logs.
    pub fn source_name(&self) -> String {
        self.source.name()
    }

    /// Produce the ranked offer list for a request.
    ///
    /// Tier precedence comes from the merge order, never from the magnitude
    /// of the candidates' order keys. Within a tier, candidates sort by their
    /// order key; the sort is stable, so equal keys keep the order the source
    /// returned them in. The concatenated list is renumbered from 1 with no
    /// gaps. An empty list is a normal outcome, not an error.
    ///
    /// If any tier lookup fails the whole ranking fails. A partial ranking
    /// would silently serve lower-tier offers in positions that belong to a
    /// more specific tier.
    pub async fn rank(
        &self,
        request: &RankingRequest,
    ) -> Result<Vec<RankedOffer>, CandidateError> {
        let mut accepted: Vec<OfferCandidate> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let direct = self
            .source
            .direct_matches(&request.campaign_id, &request.phone, request.site_id)
            .await?;
        merge_tier(&mut accepted, &mut seen, direct);
        tracing::debug!(tier = "direct", accepted = accepted.len(), "merged tier");

        let segment = self
            .source
            .segment_matches(
                &request.campaign_id,
                &request.phone,
                request.site_id,
                &seen,
            )
            .await?;
        merge_tier(&mut accepted, &mut seen, segment);
        tracing::debug!(tier = "segment", accepted = accepted.len(), "merged tier");

        let profile = self
            .source
            .profile_matches(
                &request.campaign_id,
                request.site_id,
                request.gender.as_deref(),
                request.age_bracket,
                &seen,
            )
            .await?;
        merge_tier(&mut accepted, &mut seen, profile);
        tracing::debug!(tier = "profile", accepted = accepted.len(), "merged tier");

        let defaults = self
            .source
            .priority_defaults(request.site_id, &seen)
            .await?;
        merge_tier(&mut accepted, &mut seen, defaults);
        tracing::debug!(tier = "defaults", accepted = accepted.len(), "merged tier");

        Ok(accepted
            .into_iter()
            .enumerate()
            .map(|(idx, candidate)| RankedOffer {
                rank: idx as u32 + 1,
                offer_id: candidate.offer_id,
            })
            .collect())
    }
}

/// Append one tier to the accepted list: stable-sort the tier by its local
/// order key, then keep each candidate whose offer id hasn't been accepted
/// yet.
fn merge_tier(
    accepted: &mut Vec<OfferCandidate>,
    seen: &mut HashSet<String>,
    mut tier: Vec<OfferCandidate>,
) {
    tier.sort_by_key(|candidate| candidate.order);
    for candidate in tier {
        if seen.insert(candidate.offer_id.clone()) {
            accepted.push(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fake::{Fake, Faker};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// A source that serves fixed candidate lists, applying exclusions the
    /// way a real backend would, and that records the exclusion set each
    /// lookup received.
    #[derive(Default)]
    struct ListSource {
        direct: Vec<OfferCandidate>,
        segment: Vec<OfferCandidate>,
        profile: Vec<OfferCandidate>,
        defaults: Vec<OfferCandidate>,
        fail_tier: Option<&'static str>,
        received_exclusions: Mutex<Vec<HashSet<String>>>,
    }

    impl ListSource {
        fn answer(
            &self,
            tier: &'static str,
            candidates: &[OfferCandidate],
            excluded: &HashSet<String>,
        ) -> Result<Vec<OfferCandidate>, CandidateError> {
            self.received_exclusions
                .lock()
                .unwrap()
                .push(excluded.clone());
            if self.fail_tier == Some(tier) {
                return Err(CandidateError::Backend(anyhow::anyhow!("injected failure")));
            }
            Ok(candidates
                .iter()
                .filter(|candidate| !excluded.contains(&candidate.offer_id))
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl CandidateSource for ListSource {
        fn name(&self) -> String {
            "ListSource".to_string()
        }

        async fn direct_matches(
            &self,
            _campaign_id: &str,
            _phone: &str,
            _site_id: i64,
        ) -> Result<Vec<OfferCandidate>, CandidateError> {
            self.answer("direct", &self.direct, &HashSet::new())
        }

        async fn segment_matches(
            &self,
            _campaign_id: &str,
            _phone: &str,
            _site_id: i64,
            excluded: &HashSet<String>,
        ) -> Result<Vec<OfferCandidate>, CandidateError> {
            self.answer("segment", &self.segment, excluded)
        }

        async fn profile_matches(
            &self,
            _campaign_id: &str,
            _site_id: i64,
            _gender: Option<&str>,
            _bracket: Option<crate::AgeBracket>,
            excluded: &HashSet<String>,
        ) -> Result<Vec<OfferCandidate>, CandidateError> {
            self.answer("profile", &self.profile, excluded)
        }

        async fn priority_defaults(
            &self,
            _site_id: i64,
            excluded: &HashSet<String>,
        ) -> Result<Vec<OfferCandidate>, CandidateError> {
            self.answer("defaults", &self.defaults, excluded)
        }
    }

    /// Shorthand for the expected output entries.
    fn ranked(entries: &[(u32, &str)]) -> Vec<RankedOffer> {
        entries
            .iter()
            .map(|(rank, offer_id)| RankedOffer {
                rank: *rank,
                offer_id: offer_id.to_string(),
            })
            .collect()
    }

    fn any_request() -> RankingRequest {
        Faker.fake()
    }

    #[tokio::test]
    async fn tiers_merge_with_earlier_tiers_winning() {
        let source = ListSource {
            direct: vec![OfferCandidate::new(1, "A"), OfferCandidate::new(2, "B")],
            segment: vec![OfferCandidate::new(1, "B"), OfferCandidate::new(2, "C")],
            profile: vec![],
            defaults: vec![OfferCandidate::new(1, "A"), OfferCandidate::new(2, "D")],
            ..ListSource::default()
        };
        let ranker = OfferRanker::new(Arc::new(source));

        let offers = ranker.rank(&any_request()).await.expect("ranking failed");

        assert_eq!(offers, ranked(&[(1, "A"), (2, "B"), (3, "C"), (4, "D")]));
    }

    #[tokio::test]
    async fn exclusion_sets_accumulate_across_tiers() {
        let source = Arc::new(ListSource {
            direct: vec![OfferCandidate::new(1, "A")],
            segment: vec![OfferCandidate::new(1, "B")],
            profile: vec![OfferCandidate::new(1, "C")],
            defaults: vec![OfferCandidate::new(1, "D")],
            ..ListSource::default()
        });
        let ranker = OfferRanker::new(source.clone());

        ranker.rank(&any_request()).await.expect("ranking failed");

        let into_set = |ids: &[&str]| {
            ids.iter()
                .map(|id| id.to_string())
                .collect::<HashSet<String>>()
        };
        let received = source.received_exclusions.lock().unwrap();
        assert_eq!(received.len(), 4);
        assert_eq!(received[0], into_set(&[]));
        assert_eq!(received[1], into_set(&["A"]));
        assert_eq!(received[2], into_set(&["A", "B"]));
        assert_eq!(received[3], into_set(&["A", "B", "C"]));
    }

    #[tokio::test]
    async fn tier_precedence_ignores_order_key_magnitude() {
        // The direct tier has much larger order keys than the defaults tier.
        // It still comes out first.
        let source = ListSource {
            direct: vec![OfferCandidate::new(900, "HI")],
            defaults: vec![OfferCandidate::new(1, "LO")],
            ..ListSource::default()
        };
        let ranker = OfferRanker::new(Arc::new(source));

        let offers = ranker.rank(&any_request()).await.expect("ranking failed");

        assert_eq!(offers, ranked(&[(1, "HI"), (2, "LO")]));
    }

    #[tokio::test]
    async fn candidates_sort_by_order_key_within_a_tier() {
        let source = ListSource {
            direct: vec![
                OfferCandidate::new(5, "LAST"),
                OfferCandidate::new(1, "FIRST"),
                OfferCandidate::new(3, "MIDDLE"),
            ],
            ..ListSource::default()
        };
        let ranker = OfferRanker::new(Arc::new(source));

        let offers = ranker.rank(&any_request()).await.expect("ranking failed");

        assert_eq!(offers, ranked(&[(1, "FIRST"), (2, "MIDDLE"), (3, "LAST")]));
    }

    #[tokio::test]
    async fn equal_order_keys_keep_source_order() {
        let source = ListSource {
            direct: vec![
                OfferCandidate::new(1, "X"),
                OfferCandidate::new(1, "Y"),
                OfferCandidate::new(1, "Z"),
            ],
            ..ListSource::default()
        };
        let ranker = OfferRanker::new(Arc::new(source));

        let offers = ranker.rank(&any_request()).await.expect("ranking failed");

        assert_eq!(offers, ranked(&[(1, "X"), (2, "Y"), (3, "Z")]));
    }

    #[tokio::test]
    async fn duplicates_within_a_tier_are_kept_once() {
        let source = ListSource {
            direct: vec![
                OfferCandidate::new(1, "A"),
                OfferCandidate::new(3, "A"),
                OfferCandidate::new(2, "B"),
            ],
            ..ListSource::default()
        };
        let ranker = OfferRanker::new(Arc::new(source));

        let offers = ranker.rank(&any_request()).await.expect("ranking failed");

        assert_eq!(offers, ranked(&[(1, "A"), (2, "B")]));
    }

    #[tokio::test]
    async fn no_candidates_is_an_empty_ranking() {
        let ranker = OfferRanker::new(Arc::new(ListSource::default()));

        let offers = ranker.rank(&any_request()).await.expect("ranking failed");

        assert_eq!(offers, vec![]);
    }

    #[tokio::test]
    async fn empty_upper_tiers_fall_back_to_defaults() {
        let source = ListSource {
            defaults: vec![
                OfferCandidate::new(2, "SECOND"),
                OfferCandidate::new(1, "FIRST"),
            ],
            ..ListSource::default()
        };
        let ranker = OfferRanker::new(Arc::new(source));

        let offers = ranker.rank(&any_request()).await.expect("ranking failed");

        assert_eq!(offers, ranked(&[(1, "FIRST"), (2, "SECOND")]));
    }

    #[tokio::test]
    async fn a_failing_tier_fails_the_whole_ranking() {
        for tier in ["direct", "segment", "profile", "defaults"] {
            let source = ListSource {
                direct: vec![OfferCandidate::new(1, "A")],
                segment: vec![OfferCandidate::new(1, "B")],
                profile: vec![OfferCandidate::new(1, "C")],
                defaults: vec![OfferCandidate::new(1, "D")],
                fail_tier: Some(tier),
                ..ListSource::default()
            };
            let ranker = OfferRanker::new(Arc::new(source));

            let outcome = ranker.rank(&any_request()).await;

            assert!(
                matches!(outcome, Err(CandidateError::Backend(_))),
                "tier {} should have failed the ranking",
                tier
            );
        }
    }

    #[tokio::test]
    async fn ranks_are_contiguous_and_ids_unique_for_arbitrary_tiers() {
        for _ in 0..20 {
            let source = ListSource {
                direct: fake::vec![OfferCandidate; 0..8],
                segment: fake::vec![OfferCandidate; 0..8],
                profile: fake::vec![OfferCandidate; 0..8],
                defaults: fake::vec![OfferCandidate; 0..8],
                ..ListSource::default()
            };
            let ranker = OfferRanker::new(Arc::new(source));

            let offers = ranker.rank(&any_request()).await.expect("ranking failed");

            let mut ids = HashSet::new();
            for (idx, offer) in offers.iter().enumerate() {
                assert_eq!(offer.rank, idx as u32 + 1);
                assert!(
                    ids.insert(offer.offer_id.clone()),
                    "duplicate offer id {} in ranking",
                    offer.offer_id
                );
            }
        }
    }
}
