//! Web handlers for the offer ranking API.

use crate::{errors::HandlerError, extractors::OfferRequestWrapper, sources::CandidateSourceRef};
use actix_web::{
    route,
    web::{Data, ServiceConfig},
    HttpResponse,
};
use cadence::{Histogrammed, StatsdClient};
use oferta_ranking::{RankedOffer, RankingRequest};
use oferta_settings::Settings;
use serde::{Serialize, Serializer};

/// Configure a route to serve the ranking API.
pub fn configure(config: &mut ServiceConfig) {
    config.service(rank_offers);
}

/// Rank offers for the customer described by the request parameters.
///
/// The kiosks send GETs with query parameters; the mobile app POSTs a JSON
/// body. Both shapes land here.
#[route("", method = "GET", method = "POST")]
async fn rank_offers(
    OfferRequestWrapper(request): OfferRequestWrapper,
    sources: Data<CandidateSourceRef>,
    metrics_client: Data<StatsdClient>,
    settings: Data<Settings>,
) -> Result<HttpResponse, HandlerError> {
    safe_log_request(settings.log_full_request, &request);

    let ranker = sources.get_or_init(&settings).await.map_err(|error| {
        tracing::error!(%error, r#type = "web.offers.source-init-error", "Could not set up the candidate source");
        error
    })?;

    let offers = ranker.rank(&request).await.map_err(|error| {
        tracing::error!(%error, r#type = "web.offers.error", "Error while ranking offers");
        error
    })?;

    tracing::debug!(
        r#type = "web.offers.provided-count",
        offer_count = offers.len(),
        "Providing ranked offers"
    );
    metrics_client
        .histogram("request.offers-per", offers.len() as u64)
        .ok();

    Ok(HttpResponse::Ok().json(
        offers
            .iter()
            .map(RankedOfferWrapper)
            .collect::<Vec<_>>(),
    ))
}

/// Log a ranking request in a shape friendly to log processors. The phone
/// number is only included if the `log_full_request` setting is on.
fn safe_log_request(log_full_request: bool, request: &RankingRequest) {
    let celular = if log_full_request {
        request.phone.as_str()
    } else {
        ""
    };
    tracing::info!(
        r#type = "web.offers.request",
        sensitive = true,
        campanha = %request.campaign_id,
        celular,
        local_id = request.site_id,
        genero = request.gender.as_deref(),
        faixa_etaria = request.age_bracket.map(|bracket| bracket.as_str()),
        "Offer request"
    );
}

/// Customizes the output format of [`RankedOffer`] to match the wire contract
/// of the previous generation of this service.
#[derive(Debug)]
struct RankedOfferWrapper<'a>(&'a RankedOffer);

impl<'a> Serialize for RankedOfferWrapper<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        /// The published field names.
        #[derive(Serialize)]
        struct Generated<'a> {
            /// Position in the ranking, starting at 1.
            ordem: u32,
            /// The offer's platform identifier.
            oferta: &'a str,
        }

        Generated {
            ordem: self.0.rank,
            oferta: &self.0.offer_id,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::RankedOfferWrapper;
    use oferta_ranking::RankedOffer;
    use pretty_assertions::assert_eq;

    #[test]
    fn ranked_offers_serialize_to_the_published_shape() {
        let offer = RankedOffer {
            rank: 3,
            offer_id: "OF-123".to_string(),
        };

        let serialized =
            serde_json::to_string(&RankedOfferWrapper(&offer)).expect("could not serialize");

        assert_eq!(serialized, r#"{"ordem":3,"oferta":"OF-123"}"#);
    }
}
