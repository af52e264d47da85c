//! The ClickHouse-backed candidate source.

use anyhow::Context;
use async_trait::async_trait;
use clickhouse::{Client, Compression, Row};
use oferta_ranking::{AgeBracket, CandidateError, CandidateSource, OfferCandidate, SetupError};
use oferta_settings::{ClickHouseCompression, ClickHouseConfig, TableFamily};
use serde::Deserialize;
use std::{collections::HashSet, future::Future, time::Duration};

/// The fully qualified names of the four recommendation tables a deployment
/// reads from.
#[derive(Clone, Copy, Debug)]
struct TableSet {
    /// The database holding the tables. Only used for naming the source.
    database: &'static str,
    /// Offers assigned directly to customers.
    customer: &'static str,
    /// Offers assigned to customer segments.
    segment: &'static str,
    /// Offers assigned to demographic profiles.
    profile: &'static str,
    /// Site-wide default offer priorities.
    priority: &'static str,
}

impl TableSet {
    /// The tables that make up the given family. These names are fixed at
    /// compile time; queries never interpolate anything else into their FROM
    /// clauses.
    fn for_family(family: TableFamily) -> Self {
        match family {
            TableFamily::General => Self {
                database: "recomendacao_geral",
                customer: "recomendacao_geral.cliente",
                segment: "recomendacao_geral.cliente_segmento",
                profile: "recomendacao_geral.perfil",
                priority: "recomendacao_geral.ofertas_priorizacao",
            },
            TableFamily::Ads => Self {
                database: "recomendacao_ads",
                customer: "recomendacao_ads.geral_cliente",
                segment: "recomendacao_ads.geral_cliente_segmento",
                profile: "recomendacao_ads.geral_perfil",
                priority: "recomendacao_ads.geral_ofertas_priorizacao",
            },
        }
    }
}

/// One `(ordem, pangeia_offer_id)` row, the shape every candidate query
/// selects. Field order must match the SELECT list.
#[derive(Debug, Row, Deserialize)]
struct CandidateRow {
    /// Ordering key of the offer within its tier.
    ordem: u32,
    /// Identifier of the offer in the offer platform.
    pangeia_offer_id: String,
}

/// A [`CandidateSource`] that reads the recommendation tables of a ClickHouse
/// deployment.
///
/// Customer and campaign values reach ClickHouse only through bound
/// parameters. The query text itself is assembled from fixed fragments, so a
/// hostile request value cannot change the query's shape.
pub struct ClickHouseSource {
    /// The HTTP client for the deployment.
    client: Client,
    /// The table family this deployment serves.
    tables: TableSet,
    /// Deadline for any single candidate query.
    query_timeout: Duration,
}

impl ClickHouseSource {
    /// Build a source from settings.
    ///
    /// Only the URL is validated here. No connection is made until the first
    /// lookup, so a wrong host or password shows up as a [`CandidateError`]
    /// on requests, not as a setup failure.
    pub fn new(config: &ClickHouseConfig) -> Result<Self, SetupError> {
        let url = config
            .url
            .parse::<http::Uri>()
            .context("could not parse the ClickHouse URL")
            .map_err(SetupError::InvalidConfiguration)?;
        match url.scheme_str() {
            Some("http") | Some("https") => (),
            _ => {
                return Err(SetupError::InvalidConfiguration(anyhow::anyhow!(
                    "the ClickHouse URL must start with http:// or https://"
                )))
            }
        }

        let client = Client::default()
            .with_url(&config.url)
            .with_user(&config.user)
            .with_password(&config.password)
            .with_compression(match config.compression {
                ClickHouseCompression::Lz4 => Compression::Lz4,
                ClickHouseCompression::None => Compression::None,
            });

        Ok(Self {
            client,
            tables: TableSet::for_family(config.tables),
            query_timeout: config.query_timeout,
        })
    }

    /// Await one tier's fetch with the configured deadline, and map its rows
    /// to candidates.
    async fn run<F>(
        &self,
        tier: &'static str,
        fetch: F,
    ) -> Result<Vec<OfferCandidate>, CandidateError>
    where
        F: Future<Output = Result<Vec<CandidateRow>, clickhouse::error::Error>>,
    {
        let rows = tokio::time::timeout(self.query_timeout, fetch)
            .await
            .map_err(|_elapsed| CandidateError::Timeout)?
            .map_err(|error| CandidateError::Backend(error.into()))?;

        tracing::debug!(
            r#type = "clickhouse.fetch",
            tier,
            rows = rows.len(),
            "fetched candidates"
        );

        Ok(rows
            .into_iter()
            .map(|row| OfferCandidate::new(row.ordem, row.pangeia_offer_id))
            .collect())
    }
}

/// The query for offers assigned directly to a customer.
fn direct_sql(table: &str) -> String {
    format!(
        "SELECT DISTINCT ordem, pangeia_offer_id FROM {} \
         WHERE campaign_id = ? AND celular = ? AND local_id = ?",
        table
    )
}

/// The query for offers assigned to a customer's segments.
fn segment_sql(table: &str, has_exclusions: bool) -> String {
    let mut sql = direct_sql(table);
    if has_exclusions {
        sql.push_str(" AND pangeia_offer_id NOT IN ?");
    }
    sql
}

/// The query for offers assigned to a demographic profile. The gender and
/// bracket comparisons switch to `IS NULL` when the request has no value,
/// since `column = NULL` never matches anything.
fn profile_sql(table: &str, has_gender: bool, has_bracket: bool, has_exclusions: bool) -> String {
    let mut sql = format!(
        "SELECT ordem, pangeia_offer_id FROM {} WHERE campaign_id = ? AND local_id = ?",
        table
    );
    sql.push_str(if has_gender {
        " AND genero = ?"
    } else {
        " AND genero IS NULL"
    });
    sql.push_str(if has_bracket {
        " AND faixa_etaria = ?"
    } else {
        " AND faixa_etaria IS NULL"
    });
    if has_exclusions {
        sql.push_str(" AND pangeia_offer_id NOT IN ?");
    }
    sql
}

/// The query for a site's default offers.
fn priority_sql(table: &str, has_exclusions: bool) -> String {
    let mut sql = format!(
        "SELECT ordem, pangeia_offer_id FROM {} WHERE local_id = ?",
        table
    );
    if has_exclusions {
        sql.push_str(" AND pangeia_offer_id NOT IN ?");
    }
    sql
}

/// The exclusion set as a sorted list, so that query parameters are
/// deterministic for a given set.
fn sorted_ids(excluded: &HashSet<String>) -> Vec<&str> {
    let mut ids: Vec<&str> = excluded.iter().map(String::as_str).collect();
    ids.sort_unstable();
    ids
}

#[async_trait]
impl CandidateSource for ClickHouseSource {
    fn name(&self) -> String {
        format!("clickhouse({})", self.tables.database)
    }

    async fn direct_matches(
        &self,
        campaign_id: &str,
        phone: &str,
        site_id: i64,
    ) -> Result<Vec<OfferCandidate>, CandidateError> {
        let query = self
            .client
            .query(&direct_sql(self.tables.customer))
            .bind(campaign_id)
            .bind(phone)
            .bind(site_id);
        self.run("direct", query.fetch_all::<CandidateRow>()).await
    }

    async fn segment_matches(
        &self,
        campaign_id: &str,
        phone: &str,
        site_id: i64,
        excluded: &HashSet<String>,
    ) -> Result<Vec<OfferCandidate>, CandidateError> {
        let mut query = self
            .client
            .query(&segment_sql(self.tables.segment, !excluded.is_empty()))
            .bind(campaign_id)
            .bind(phone)
            .bind(site_id);
        if !excluded.is_empty() {
            query = query.bind(sorted_ids(excluded));
        }
        self.run("segment", query.fetch_all::<CandidateRow>()).await
    }

    async fn profile_matches(
        &self,
        campaign_id: &str,
        site_id: i64,
        gender: Option<&str>,
        bracket: Option<AgeBracket>,
        excluded: &HashSet<String>,
    ) -> Result<Vec<OfferCandidate>, CandidateError> {
        let sql = profile_sql(
            self.tables.profile,
            gender.is_some(),
            bracket.is_some(),
            !excluded.is_empty(),
        );
        let mut query = self.client.query(&sql).bind(campaign_id).bind(site_id);
        if let Some(gender) = gender {
            query = query.bind(gender);
        }
        if let Some(bracket) = bracket {
            query = query.bind(bracket.as_str());
        }
        if !excluded.is_empty() {
            query = query.bind(sorted_ids(excluded));
        }
        self.run("profile", query.fetch_all::<CandidateRow>()).await
    }

    async fn priority_defaults(
        &self,
        site_id: i64,
        excluded: &HashSet<String>,
    ) -> Result<Vec<OfferCandidate>, CandidateError> {
        let mut query = self
            .client
            .query(&priority_sql(self.tables.priority, !excluded.is_empty()))
            .bind(site_id);
        if !excluded.is_empty() {
            query = query.bind(sorted_ids(excluded));
        }
        self.run("defaults", query.fetch_all::<CandidateRow>())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clickhouse::test::{handlers, Mock};
    use futures_util::stream;
    use pretty_assertions::assert_eq;
    use serde::Serialize;

    /// The row shape the mock server sends back.
    #[derive(Debug, Row, Serialize)]
    struct MockRow {
        ordem: u32,
        pangeia_offer_id: String,
    }

    fn config_for(url: &str) -> ClickHouseConfig {
        ClickHouseConfig {
            url: url.to_string(),
            user: "default".to_string(),
            password: String::new(),
            tables: TableFamily::General,
            compression: ClickHouseCompression::None,
            query_timeout: Duration::from_secs(5),
        }
    }

    fn excluded(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn table_names_for_both_families() {
        let general = TableSet::for_family(TableFamily::General);
        assert_eq!(general.customer, "recomendacao_geral.cliente");
        assert_eq!(general.segment, "recomendacao_geral.cliente_segmento");
        assert_eq!(general.profile, "recomendacao_geral.perfil");
        assert_eq!(general.priority, "recomendacao_geral.ofertas_priorizacao");

        let ads = TableSet::for_family(TableFamily::Ads);
        assert_eq!(ads.customer, "recomendacao_ads.geral_cliente");
        assert_eq!(ads.segment, "recomendacao_ads.geral_cliente_segmento");
        assert_eq!(ads.profile, "recomendacao_ads.geral_perfil");
        assert_eq!(ads.priority, "recomendacao_ads.geral_ofertas_priorizacao");
    }

    #[test]
    fn query_text_only_holds_placeholders() {
        assert_eq!(
            direct_sql("recomendacao_geral.cliente"),
            "SELECT DISTINCT ordem, pangeia_offer_id FROM recomendacao_geral.cliente \
             WHERE campaign_id = ? AND celular = ? AND local_id = ?"
        );
        assert_eq!(
            segment_sql("recomendacao_geral.cliente_segmento", true),
            "SELECT DISTINCT ordem, pangeia_offer_id FROM recomendacao_geral.cliente_segmento \
             WHERE campaign_id = ? AND celular = ? AND local_id = ? \
             AND pangeia_offer_id NOT IN ?"
        );
    }

    #[test]
    fn profile_query_switches_to_is_null_for_unset_fields() {
        let all_set = profile_sql("t", true, true, true);
        assert!(all_set.contains("genero = ?"));
        assert!(all_set.contains("faixa_etaria = ?"));
        assert!(all_set.contains("pangeia_offer_id NOT IN ?"));

        let none_set = profile_sql("t", false, false, false);
        assert!(none_set.contains("genero IS NULL"));
        assert!(none_set.contains("faixa_etaria IS NULL"));
        assert!(!none_set.contains("NOT IN"));
        assert!(!none_set.contains("genero = ?"));
    }

    #[test]
    fn exclusion_clause_is_omitted_when_nothing_is_excluded() {
        assert!(!segment_sql("t", false).contains("NOT IN"));
        assert!(!priority_sql("t", false).contains("NOT IN"));
        assert!(priority_sql("t", true).ends_with("AND pangeia_offer_id NOT IN ?"));
    }

    #[test]
    fn exclusion_ids_are_sorted() {
        let ids = excluded(&["B", "A", "C"]);
        assert_eq!(sorted_ids(&ids), vec!["A", "B", "C"]);
    }

    #[test]
    fn urls_without_a_scheme_fail_setup() {
        for url in ["localhost:8123", "ftp://example.com", "not a url"] {
            let outcome = ClickHouseSource::new(&config_for(url));
            assert!(
                matches!(outcome, Err(SetupError::InvalidConfiguration(_))),
                "URL {:?} should have been rejected",
                url
            );
        }
    }

    #[tokio::test]
    async fn rows_map_to_candidates() {
        let mock = Mock::new();
        let source = ClickHouseSource::new(&config_for(mock.url().as_ref()))
            .expect("could not build source");
        mock.add(handlers::provide(stream::iter(vec![
            MockRow {
                ordem: 2,
                pangeia_offer_id: "OF-2".to_string(),
            },
            MockRow {
                ordem: 1,
                pangeia_offer_id: "OF-1".to_string(),
            },
        ])));

        let found = source
            .direct_matches("camp", "11999", 42)
            .await
            .expect("lookup failed");

        assert_eq!(
            found,
            vec![
                OfferCandidate::new(2, "OF-2"),
                OfferCandidate::new(1, "OF-1"),
            ]
        );
    }

    #[tokio::test]
    async fn empty_results_are_not_errors() {
        let mock = Mock::new();
        let source = ClickHouseSource::new(&config_for(mock.url().as_ref()))
            .expect("could not build source");
        mock.add(handlers::provide(stream::iter(Vec::<MockRow>::new())));

        let found = source
            .priority_defaults(42, &excluded(&["OF-1"]))
            .await
            .expect("lookup failed");

        assert_eq!(found, vec![]);
    }

    #[tokio::test]
    async fn unreachable_backends_are_backend_errors() {
        // Port 9 is the discard service; nothing should be listening there.
        let source = ClickHouseSource::new(&config_for("http://127.0.0.1:9"))
            .expect("could not build source");

        let outcome = source.direct_matches("camp", "11999", 42).await;

        assert!(matches!(outcome, Err(CandidateError::Backend(_))));
    }

    #[tokio::test]
    async fn slow_backends_are_timeout_errors() {
        let mock = Mock::new();
        let mut config = config_for(mock.url().as_ref());
        config.query_timeout = Duration::from_millis(0);
        let source = ClickHouseSource::new(&config).expect("could not build source");

        let outcome = source.direct_matches("camp", "11999", 42).await;

        assert!(matches!(outcome, Err(CandidateError::Timeout)));
    }
}
