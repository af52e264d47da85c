//! A candidate source that serves offer lists straight from settings.

use crate::{AgeBracket, CandidateError, CandidateSource, OfferCandidate, SetupError};
use anyhow::Context;
use async_trait::async_trait;
use oferta_settings::{CustomerOfferRow, MemoryConfig, PriorityOfferRow};
use std::collections::HashSet;

/// A [`CandidateSource`] that answers lookups from fixed in-memory lists.
///
/// This is the source used by development configs and the integration tests.
/// It implements the same matching rules as the ClickHouse source, including
/// the "unset matches only unset" rule for profile columns.
pub struct MemorySource {
    /// Offers assigned directly to customers.
    customer: Vec<CustomerOfferRow>,
    /// Offers assigned to customer segments.
    segment: Vec<CustomerOfferRow>,
    /// Offers assigned to demographic profiles, with the bracket parsed.
    profile: Vec<ProfileRecord>,
    /// Site-wide default offers.
    priority: Vec<PriorityOfferRow>,
}

/// A profile row with its age bracket parsed into the domain type.
struct ProfileRecord {
    /// The campaign the offer is served under.
    campaign_id: String,
    /// The site the assignment applies to.
    site_id: i64,
    /// Gender the profile applies to, if any.
    gender: Option<String>,
    /// Age bracket the profile applies to, if any.
    bracket: Option<AgeBracket>,
    /// Ordering key within the profile tier.
    order: u32,
    /// The offer to serve.
    offer_id: String,
}

impl MemorySource {
    /// Build a source from settings.
    ///
    /// Fails if any profile row names an age bracket that isn't one of F1
    /// through F4.
    pub fn new(config: &MemoryConfig) -> Result<Self, SetupError> {
        let profile = config
            .profile_offers
            .iter()
            .map(|row| {
                let bracket = row
                    .faixa_etaria
                    .as_deref()
                    .map(|name| {
                        name.parse::<AgeBracket>()
                            .with_context(|| format!("profile row for offer {:?}", row.offer_id))
                    })
                    .transpose()
                    .map_err(SetupError::InvalidConfiguration)?;
                Ok(ProfileRecord {
                    campaign_id: row.campaign_id.clone(),
                    site_id: row.local_id,
                    gender: row.genero.clone(),
                    bracket,
                    order: row.ordem,
                    offer_id: row.offer_id.clone(),
                })
            })
            .collect::<Result<Vec<_>, SetupError>>()?;

        Ok(Self {
            customer: config.customer_offers.clone(),
            segment: config.segment_offers.clone(),
            profile,
            priority: config.priority_offers.clone(),
        })
    }
}

/// Filter one of the customer-keyed tables.
fn customer_lookup(
    rows: &[CustomerOfferRow],
    campaign_id: &str,
    phone: &str,
    site_id: i64,
    excluded: &HashSet<String>,
) -> Vec<OfferCandidate> {
    rows.iter()
        .filter(|row| {
            row.campaign_id == campaign_id
                && row.celular == phone
                && row.local_id == site_id
                && !excluded.contains(&row.offer_id)
        })
        .map(|row| OfferCandidate::new(row.ordem, &row.offer_id))
        .collect()
}

#[async_trait]
impl CandidateSource for MemorySource {
    fn name(&self) -> String {
        "memory".to_string()
    }

    async fn direct_matches(
        &self,
        campaign_id: &str,
        phone: &str,
        site_id: i64,
    ) -> Result<Vec<OfferCandidate>, CandidateError> {
        Ok(customer_lookup(
            &self.customer,
            campaign_id,
            phone,
            site_id,
            &HashSet::new(),
        ))
    }

    async fn segment_matches(
        &self,
        campaign_id: &str,
        phone: &str,
        site_id: i64,
        excluded: &HashSet<String>,
    ) -> Result<Vec<OfferCandidate>, CandidateError> {
        Ok(customer_lookup(
            &self.segment,
            campaign_id,
            phone,
            site_id,
            excluded,
        ))
    }

    async fn profile_matches(
        &self,
        campaign_id: &str,
        site_id: i64,
        gender: Option<&str>,
        bracket: Option<AgeBracket>,
        excluded: &HashSet<String>,
    ) -> Result<Vec<OfferCandidate>, CandidateError> {
        Ok(self
            .profile
            .iter()
            .filter(|record| {
                record.campaign_id == campaign_id
                    && record.site_id == site_id
                    && record.gender.as_deref() == gender
                    && record.bracket == bracket
                    && !excluded.contains(&record.offer_id)
            })
            .map(|record| OfferCandidate::new(record.order, &record.offer_id))
            .collect())
    }

    async fn priority_defaults(
        &self,
        site_id: i64,
        excluded: &HashSet<String>,
    ) -> Result<Vec<OfferCandidate>, CandidateError> {
        Ok(self
            .priority
            .iter()
            .filter(|row| row.local_id == site_id && !excluded.contains(&row.offer_id))
            .map(|row| OfferCandidate::new(row.ordem, &row.offer_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oferta_settings::ProfileOfferRow;
    use pretty_assertions::assert_eq;

    fn customer_row(
        campaign_id: &str,
        celular: &str,
        local_id: i64,
        ordem: u32,
        offer_id: &str,
    ) -> CustomerOfferRow {
        CustomerOfferRow {
            campaign_id: campaign_id.to_string(),
            celular: celular.to_string(),
            local_id,
            ordem,
            offer_id: offer_id.to_string(),
        }
    }

    fn profile_row(
        genero: Option<&str>,
        faixa_etaria: Option<&str>,
        ordem: u32,
        offer_id: &str,
    ) -> ProfileOfferRow {
        ProfileOfferRow {
            campaign_id: "camp".to_string(),
            local_id: 42,
            genero: genero.map(str::to_string),
            faixa_etaria: faixa_etaria.map(str::to_string),
            ordem,
            offer_id: offer_id.to_string(),
        }
    }

    fn source(config: MemoryConfig) -> MemorySource {
        MemorySource::new(&config).expect("could not build memory source")
    }

    #[tokio::test]
    async fn direct_matches_filter_on_all_three_keys() {
        let source = source(MemoryConfig {
            customer_offers: vec![
                customer_row("camp", "11999", 42, 1, "MATCH"),
                customer_row("camp", "11999", 43, 1, "WRONG-SITE"),
                customer_row("camp", "11000", 42, 1, "WRONG-PHONE"),
                customer_row("other", "11999", 42, 1, "WRONG-CAMPAIGN"),
            ],
            ..MemoryConfig::default()
        });

        let found = source
            .direct_matches("camp", "11999", 42)
            .await
            .expect("lookup failed");

        assert_eq!(found, vec![OfferCandidate::new(1, "MATCH")]);
    }

    #[tokio::test]
    async fn segment_matches_honor_exclusions() {
        let source = source(MemoryConfig {
            segment_offers: vec![
                customer_row("camp", "11999", 42, 1, "TAKEN"),
                customer_row("camp", "11999", 42, 2, "FRESH"),
            ],
            ..MemoryConfig::default()
        });
        let excluded = HashSet::from(["TAKEN".to_string()]);

        let found = source
            .segment_matches("camp", "11999", 42, &excluded)
            .await
            .expect("lookup failed");

        assert_eq!(found, vec![OfferCandidate::new(2, "FRESH")]);
    }

    #[tokio::test]
    async fn profile_matches_use_unset_matches_unset_rules() {
        let source = source(MemoryConfig {
            profile_offers: vec![
                profile_row(Some("F"), Some("F2"), 1, "EXACT"),
                profile_row(Some("F"), None, 2, "NO-BRACKET"),
                profile_row(None, None, 3, "NO-PROFILE"),
            ],
            ..MemoryConfig::default()
        });

        let exact = source
            .profile_matches("camp", 42, Some("F"), Some(AgeBracket::F2), &HashSet::new())
            .await
            .expect("lookup failed");
        assert_eq!(exact, vec![OfferCandidate::new(1, "EXACT")]);

        let no_bracket = source
            .profile_matches("camp", 42, Some("F"), None, &HashSet::new())
            .await
            .expect("lookup failed");
        assert_eq!(no_bracket, vec![OfferCandidate::new(2, "NO-BRACKET")]);

        let no_profile = source
            .profile_matches("camp", 42, None, None, &HashSet::new())
            .await
            .expect("lookup failed");
        assert_eq!(no_profile, vec![OfferCandidate::new(3, "NO-PROFILE")]);
    }

    #[tokio::test]
    async fn priority_defaults_filter_on_site() {
        let source = source(MemoryConfig {
            priority_offers: vec![
                PriorityOfferRow {
                    local_id: 42,
                    ordem: 1,
                    offer_id: "HERE".to_string(),
                },
                PriorityOfferRow {
                    local_id: 7,
                    ordem: 1,
                    offer_id: "ELSEWHERE".to_string(),
                },
            ],
            ..MemoryConfig::default()
        });

        let found = source
            .priority_defaults(42, &HashSet::new())
            .await
            .expect("lookup failed");

        assert_eq!(found, vec![OfferCandidate::new(1, "HERE")]);
    }

    #[test]
    fn unknown_brackets_fail_setup() {
        let outcome = MemorySource::new(&MemoryConfig {
            profile_offers: vec![profile_row(None, Some("F9"), 1, "BAD")],
            ..MemoryConfig::default()
        });

        assert!(matches!(
            outcome,
            Err(SetupError::InvalidConfiguration(_))
        ));
    }
}
