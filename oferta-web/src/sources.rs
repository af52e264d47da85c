//! Construction and sharing of the candidate source behind the handlers.

use oferta_clickhouse::ClickHouseSource;
use oferta_ranking::{CandidateSource, MemorySource, OfferRanker, SetupError};
use oferta_settings::{CandidateSourceConfig, Settings};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A lazily initialized handle to the ranker and its candidate source.
///
/// The source is built on the first request instead of at startup, so a
/// misconfigured backend surfaces as an error response on the requests that
/// need it instead of keeping the whole server from starting. A failed
/// attempt is retried on the next request.
#[derive(Clone, Default)]
pub struct CandidateSourceRef {
    /// The shared ranker, once a source has been set up successfully.
    ranker: Arc<OnceCell<OfferRanker>>,
}

impl CandidateSourceRef {
    /// Get the ranker, building the configured source on first use.
    pub async fn get_or_init(&self, settings: &Settings) -> Result<&OfferRanker, SetupError> {
        self.ranker
            .get_or_try_init(|| async {
                let source = make_source(settings)?;
                tracing::info!(
                    source = %source.name(),
                    r#type = "web.configuring-source",
                    "Candidate source initialized"
                );
                Ok(OfferRanker::new(source))
            })
            .await
    }
}

/// Build the candidate source selected by the settings.
fn make_source(settings: &Settings) -> Result<Arc<dyn CandidateSource>, SetupError> {
    Ok(match &settings.source {
        CandidateSourceConfig::ClickHouse(config) => Arc::new(ClickHouseSource::new(config)?),
        CandidateSourceConfig::Memory(config) => Arc::new(MemorySource::new(config)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use oferta_settings::Settings;

    #[actix_rt::test]
    async fn failed_initialization_is_retried() {
        let mut settings = Settings::load_for_tests(|_| ());
        settings.source = CandidateSourceConfig::ClickHouse(oferta_settings::ClickHouseConfig {
            url: "not a url".to_string(),
            user: String::new(),
            password: String::new(),
            tables: oferta_settings::TableFamily::General,
            compression: oferta_settings::ClickHouseCompression::default(),
            query_timeout: std::time::Duration::from_secs(5),
        });

        let sources = CandidateSourceRef::default();
        assert!(sources.get_or_init(&settings).await.is_err());

        // A good config on the next request succeeds on the same handle.
        settings.source = CandidateSourceConfig::Memory(oferta_settings::MemoryConfig::default());
        assert!(sources.get_or_init(&settings).await.is_ok());
    }

    #[actix_rt::test]
    async fn successful_initialization_is_reused() {
        let settings = Settings::load_for_tests(|settings| {
            settings.source =
                CandidateSourceConfig::Memory(oferta_settings::MemoryConfig::default());
        });

        let sources = CandidateSourceRef::default();
        let first = sources
            .get_or_init(&settings)
            .await
            .expect("initialization failed")
            .source_name();
        let second = sources
            .get_or_init(&settings)
            .await
            .expect("initialization failed")
            .source_name();
        assert_eq!(first, second);
    }
}
