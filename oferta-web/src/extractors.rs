//! Types to extract a validated [`RankingRequest`] from HTTP requests.

use crate::errors::HandlerErrorKind;
use actix_web::{
    dev::Payload,
    web::{Bytes, Data, Query},
    Error as ActixError, FromRequest, HttpRequest,
};
use cadence::{CountedExt, StatsdClient};
use chrono::Utc;
use futures_util::FutureExt;
use oferta_ranking::{normalize_phone, parse_birth_date, AgeBracket, RankingRequest};
use serde::Deserialize;

/// The request parameters as they appear on the wire, before validation.
///
/// Each parameter is read from the URL query string first; the JSON request
/// body fills in parameters the query string doesn't mention. Clients of the
/// previous generation of this service send both shapes, sometimes mixed.
#[derive(Debug, Default, Deserialize)]
struct RawOfferParams {
    /// The campaign identifier. Required, empty counts as missing.
    campanha: Option<String>,
    /// The customer's phone number. Required, empty after normalization
    /// counts as missing.
    celular: Option<String>,
    /// The site identifier. Required.
    local_id: Option<SiteIdParam>,
    /// The customer's gender, used verbatim.
    genero: Option<String>,
    /// The customer's birth date, as an ISO date.
    nascimento: Option<String>,
}

/// `local_id` as it appears on the wire. Query strings always carry strings,
/// but JSON bodies may carry a number.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum SiteIdParam {
    /// An integer, from a JSON body.
    Integer(i64),
    /// A non-integer number, from a JSON body.
    Float(f64),
    /// A string, from either source.
    Text(String),
}

impl SiteIdParam {
    /// Interpret the wire value as a site id, if it is one.
    fn to_site_id(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            // Accept 42.0 but not 42.5.
            Self::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            Self::Float(_) => None,
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// An extractor that produces the validated request the ranker consumes.
///
/// Validation failures become 400 responses before any candidate lookup
/// happens. A birth date that doesn't parse is not a validation failure; it
/// is logged and the request continues without an age bracket.
#[derive(Debug, PartialEq, Eq)]
pub struct OfferRequestWrapper(pub RankingRequest);

impl FromRequest for OfferRequestWrapper {
    type Error = ActixError;
    type Future = futures_util::future::LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        let mut payload = payload.take();

        async move {
            let query = Query::<RawOfferParams>::from_query(req.query_string())
                .map(Query::into_inner)
                .unwrap_or_default();

            // A body that is absent, not JSON, or the wrong shape is treated
            // as if it wasn't sent. That matches what clients already rely
            // on: browsers fire GETs with no body at the same endpoint that
            // the kiosks POST to.
            let body: RawOfferParams = match Bytes::from_request(&req, &mut payload).await {
                Ok(bytes) if !bytes.is_empty() => {
                    serde_json::from_slice(&bytes).unwrap_or_default()
                }
                _ => RawOfferParams::default(),
            };

            let campaign_id = first_non_empty(query.campanha, body.campanha);
            let phone = first_non_empty(query.celular, body.celular)
                .map(|raw| normalize_phone(&raw))
                .filter(|digits| !digits.is_empty());
            let site_param = query.local_id.or(body.local_id);
            let gender = query.genero.or(body.genero);
            let birth = query.nascimento.or(body.nascimento);

            let (campaign_id, phone, site_param) = match (campaign_id, phone, site_param) {
                (Some(campaign_id), Some(phone), Some(site_param)) => {
                    (campaign_id, phone, site_param)
                }
                _ => return Err(HandlerErrorKind::MissingRequiredParams.into()),
            };

            let site_id = match site_param.to_site_id() {
                Some(site_id) => site_id,
                None => return Err(HandlerErrorKind::InvalidSiteId.into()),
            };

            let age_bracket = birth
                .as_deref()
                .and_then(|raw| interpret_birth_date(&req, raw));

            Ok(Self(RankingRequest {
                campaign_id,
                phone,
                site_id,
                gender,
                age_bracket,
            }))
        }
        .boxed_local()
    }
}

/// Take the query string's value for a required parameter, falling back to
/// the body's when the query's is missing or empty. An empty value from
/// either source counts as missing.
fn first_non_empty(from_query: Option<String>, from_body: Option<String>) -> Option<String> {
    from_query
        .filter(|value| !value.is_empty())
        .or(from_body)
        .filter(|value| !value.is_empty())
}

/// Derive the age bracket from the raw `nascimento` parameter.
///
/// Unset values stay quiet. Values that should have been dates get a warning
/// and a metric, and the request continues as if no birth date was sent.
fn interpret_birth_date(req: &HttpRequest, raw: &str) -> Option<AgeBracket> {
    match parse_birth_date(raw) {
        Ok(Some(birth_date)) => Some(AgeBracket::classify(
            birth_date,
            Utc::now().date_naive(),
        )),
        Ok(None) => None,
        Err(error) => {
            tracing::warn!(
                %error,
                nascimento = raw,
                r#type = "web.offers.bad-birthdate",
                "Ignoring birth date with invalid format"
            );
            if let Some(metrics_client) = req.app_data::<Data<StatsdClient>>() {
                metrics_client.incr("request.bad-birthdate").ok();
            }
            None
        }
    }
}
