//! Settings for the candidate source that answers offer lookups.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::time::Duration;

/// The candidate source to use, and its configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CandidateSourceConfig {
    /// Read candidates from the recommendation tables of a ClickHouse
    /// deployment.
    #[serde(rename = "clickhouse")]
    ClickHouse(ClickHouseConfig),

    /// Serve candidates from lists in the configuration itself. Useful for
    /// development and tests.
    Memory(MemoryConfig),
}

/// Settings for connecting to ClickHouse.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClickHouseConfig {
    /// The URL of the ClickHouse HTTP interface, such as
    /// "https://clickhouse.example.com:8443".
    pub url: String,

    /// The user to authenticate as.
    pub user: String,

    /// The password to authenticate with. Expected to come from the
    /// environment (`OFERTA_SOURCE__PASSWORD`) or from `config/local.yaml`.
    #[serde(serialize_with = "mask_secret")]
    pub password: String,

    /// Which family of recommendation tables to read from.
    pub tables: TableFamily,

    /// Compression to use on ClickHouse responses.
    #[serde(default)]
    pub compression: ClickHouseCompression,

    /// How long to wait, in seconds, for any single candidate query before
    /// giving up on it.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_query_timeout")]
    pub query_timeout: Duration,
}

/// The default for [`ClickHouseConfig::query_timeout`].
fn default_query_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Serialize a secret as asterisks, keeping it out of settings dumps.
fn mask_secret<S>(_secret: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str("********")
}

/// The two deployments of the recommendation tables. Each family holds the
/// same four tables under a different database and naming scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFamily {
    /// The general recommendation tables, in `recomendacao_geral`.
    General,

    /// The advertising recommendation tables, in `recomendacao_ads`.
    Ads,
}

/// Compression to use on ClickHouse responses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickHouseCompression {
    /// LZ4 compression. The default.
    #[default]
    Lz4,

    /// No compression.
    None,
}

/// Settings for the in-memory candidate source.
///
/// Phone numbers in these rows should already be in normalized form (digits
/// only), since lookups compare them to normalized request values.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Offers assigned directly to customers.
    pub customer_offers: Vec<CustomerOfferRow>,

    /// Offers assigned to segments the customers belong to.
    pub segment_offers: Vec<CustomerOfferRow>,

    /// Offers assigned to demographic profiles.
    pub profile_offers: Vec<ProfileOfferRow>,

    /// Site-wide default offers, by priority.
    pub priority_offers: Vec<PriorityOfferRow>,
}

/// One offer assignment keyed by campaign, customer and site.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomerOfferRow {
    /// The campaign the offer is served under.
    pub campaign_id: String,
    /// The customer's phone number, digits only.
    pub celular: String,
    /// The site the assignment applies to.
    pub local_id: i64,
    /// Ordering key within the assignment's tier.
    pub ordem: u32,
    /// The offer to serve.
    pub offer_id: String,
}

/// One offer assignment keyed by campaign, site and demographic profile.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileOfferRow {
    /// The campaign the offer is served under.
    pub campaign_id: String,
    /// The site the assignment applies to.
    pub local_id: i64,
    /// Gender the profile applies to. Omit to match customers with no
    /// recorded gender.
    #[serde(default)]
    pub genero: Option<String>,
    /// Age bracket the profile applies to ("F1" through "F4"). Omit to match
    /// customers with no recorded bracket.
    #[serde(default)]
    pub faixa_etaria: Option<String>,
    /// Ordering key within the profile tier.
    pub ordem: u32,
    /// The offer to serve.
    pub offer_id: String,
}

/// One entry of a site's default offer list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriorityOfferRow {
    /// The site the default applies to.
    pub local_id: i64,
    /// Priority of the offer among the site's defaults. Lower is served
    /// first.
    pub ordem: u32,
    /// The offer to serve.
    pub offer_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn clickhouse_config_fills_defaults() {
        let config: CandidateSourceConfig = serde_json::from_value(serde_json::json!({
            "type": "clickhouse",
            "url": "http://localhost:8123",
            "user": "default",
            "password": "hunter2",
            "tables": "general",
        }))
        .expect("could not deserialize source config");

        match config {
            CandidateSourceConfig::ClickHouse(clickhouse) => {
                assert_eq!(clickhouse.compression, ClickHouseCompression::Lz4);
                assert_eq!(clickhouse.query_timeout, Duration::from_secs(5));
                assert_eq!(clickhouse.tables, TableFamily::General);
            }
            other => panic!("wrong source variant: {:?}", other),
        }
    }

    #[test]
    fn passwords_do_not_appear_in_serialized_settings() {
        let config = ClickHouseConfig {
            url: "http://localhost:8123".to_string(),
            user: "default".to_string(),
            password: "hunter2".to_string(),
            tables: TableFamily::Ads,
            compression: ClickHouseCompression::default(),
            query_timeout: default_query_timeout(),
        };

        let dumped = serde_json::to_string(&config).expect("could not serialize config");
        assert!(!dumped.contains("hunter2"));
        assert!(dumped.contains("********"));
    }

    #[test]
    fn memory_config_defaults_to_empty_lists() {
        let config: CandidateSourceConfig =
            serde_json::from_value(serde_json::json!({ "type": "memory" }))
                .expect("could not deserialize source config");

        match config {
            CandidateSourceConfig::Memory(memory) => {
                assert_eq!(memory.customer_offers.len(), 0);
                assert_eq!(memory.segment_offers.len(), 0);
                assert_eq!(memory.profile_offers.len(), 0);
                assert_eq!(memory.priority_offers.len(), 0);
            }
            other => panic!("wrong source variant: {:?}", other),
        }
    }
}
