//! Tests the offer ranking API.
#![cfg(test)]

use crate::{oferta_test, TestingTools};
use anyhow::Result;
use chrono::{Duration, Utc};
use oferta_settings::{
    CandidateSourceConfig, CustomerOfferRow, MemoryConfig, PriorityOfferRow, ProfileOfferRow,
    Settings,
};
use reqwest::StatusCode;
use serde_json::json;
use statsd_parser::{Counter, Metric};

/// The campaign used by every test request.
const CAMPAIGN: &str = "natal";
/// The phone number used by every test request, already normalized.
const PHONE: &str = "11988887777";
/// The site used by every test request.
const SITE: i64 = 42;

/// The ranking path with all three required parameters filled in.
fn offers_path() -> String {
    format!(
        "/api/oferta?campanha={}&celular={}&local_id={}",
        CAMPAIGN, PHONE, SITE
    )
}

/// An offer assignment for the standard test customer.
fn assignment(ordem: u32, offer_id: &str) -> CustomerOfferRow {
    CustomerOfferRow {
        campaign_id: CAMPAIGN.to_string(),
        celular: PHONE.to_string(),
        local_id: SITE,
        ordem,
        offer_id: offer_id.to_string(),
    }
}

/// Seed the in-memory source so every tier contributes something, with
/// overlaps that exercise the exclusion rules. The expected ranking is
/// A, B from the customer tier, C from the segment tier (B is excluded
/// there), and D from the site defaults (A is excluded there).
fn seed_all_tiers(settings: &mut Settings) {
    settings.source = CandidateSourceConfig::Memory(MemoryConfig {
        customer_offers: vec![assignment(1, "OFERTA-A"), assignment(2, "OFERTA-B")],
        segment_offers: vec![assignment(1, "OFERTA-B"), assignment(2, "OFERTA-C")],
        priority_offers: vec![
            PriorityOfferRow {
                local_id: SITE,
                ordem: 1,
                offer_id: "OFERTA-A".to_string(),
            },
            PriorityOfferRow {
                local_id: SITE,
                ordem: 2,
                offer_id: "OFERTA-D".to_string(),
            },
        ],
        ..MemoryConfig::default()
    });
}

/// Seed only profile rows, so the profile tier is the only contributor.
fn seed_profiles(settings: &mut Settings) {
    settings.source = CandidateSourceConfig::Memory(MemoryConfig {
        profile_offers: vec![
            ProfileOfferRow {
                campaign_id: CAMPAIGN.to_string(),
                local_id: SITE,
                genero: Some("F".to_string()),
                faixa_etaria: Some("F2".to_string()),
                ordem: 1,
                offer_id: "OFERTA-PERFIL".to_string(),
            },
            ProfileOfferRow {
                campaign_id: CAMPAIGN.to_string(),
                local_id: SITE,
                genero: Some("F".to_string()),
                faixa_etaria: None,
                ordem: 2,
                offer_id: "OFERTA-SEM-FAIXA".to_string(),
            },
        ],
        ..MemoryConfig::default()
    });
}

#[actix_rt::test]
async fn offers_from_every_tier_merge_in_order() -> Result<()> {
    oferta_test(
        seed_all_tiers,
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get(&offers_path()).send().await?;

            assert_eq!(response.status(), StatusCode::OK);
            let body: serde_json::Value = response.json().await?;
            assert_eq!(
                body,
                json!([
                    {"ordem": 1, "oferta": "OFERTA-A"},
                    {"ordem": 2, "oferta": "OFERTA-B"},
                    {"ordem": 3, "oferta": "OFERTA-C"},
                    {"ordem": 4, "oferta": "OFERTA-D"},
                ])
            );

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn customers_with_no_offers_get_an_empty_list() -> Result<()> {
    oferta_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get(&offers_path()).send().await?;

            assert_eq!(response.status(), StatusCode::OK);
            let body: serde_json::Value = response.json().await?;
            assert_eq!(body, json!([]));

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn missing_required_params_are_rejected() -> Result<()> {
    oferta_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/api/oferta?campanha=natal").send().await?;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body: serde_json::Value = response.json().await?;
            assert_eq!(
                body,
                json!({"error": "Parâmetros 'campanha', 'celular' e 'local_id' são obrigatórios."})
            );

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn empty_required_params_in_the_body_are_rejected() -> Result<()> {
    oferta_test(
        seed_all_tiers,
        |TestingTools { test_client, .. }| async move {
            let response = test_client
                .post("/api/oferta")
                .json(&json!({
                    "campanha": "",
                    "celular": PHONE,
                    "local_id": SITE,
                }))
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body: serde_json::Value = response.json().await?;
            assert_eq!(
                body,
                json!({"error": "Parâmetros 'campanha', 'celular' e 'local_id' são obrigatórios."})
            );

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn non_numeric_site_ids_are_rejected() -> Result<()> {
    oferta_test(
        |_| (),
        |TestingTools { test_client, .. }| async move {
            let response = test_client
                .get(&format!(
                    "/api/oferta?campanha={}&celular={}&local_id=abc",
                    CAMPAIGN, PHONE
                ))
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body: serde_json::Value = response.json().await?;
            assert_eq!(
                body,
                json!({"error": "O parâmetro 'local_id' deve ser um número válido."})
            );

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn the_body_fills_in_missing_query_parameters() -> Result<()> {
    oferta_test(
        seed_all_tiers,
        |TestingTools { test_client, .. }| async move {
            // The phone arrives formatted, as the mobile app sends it.
            let response = test_client
                .post("/api/oferta")
                .json(&json!({
                    "campanha": CAMPAIGN,
                    "celular": "(11) 98888-7777",
                    "local_id": SITE,
                }))
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::OK);
            let body: serde_json::Value = response.json().await?;
            assert_eq!(
                body,
                json!([
                    {"ordem": 1, "oferta": "OFERTA-A"},
                    {"ordem": 2, "oferta": "OFERTA-B"},
                    {"ordem": 3, "oferta": "OFERTA-C"},
                    {"ordem": 4, "oferta": "OFERTA-D"},
                ])
            );

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn the_query_string_wins_over_the_body() -> Result<()> {
    oferta_test(
        seed_all_tiers,
        |TestingTools { test_client, .. }| async move {
            // The body describes a customer with no offers. Four results prove
            // the query string's customer was used instead.
            let response = test_client
                .post(&offers_path())
                .json(&json!({
                    "campanha": "pascoa",
                    "celular": "0000",
                    "local_id": 7,
                }))
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::OK);
            let body: serde_json::Value = response.json().await?;
            assert_eq!(body.as_array().map(Vec::len), Some(4));

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn malformed_bodies_are_ignored() -> Result<()> {
    oferta_test(
        seed_all_tiers,
        |TestingTools { test_client, .. }| async move {
            let response = test_client
                .post(&offers_path())
                .body("this is not json")
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::OK);
            let body: serde_json::Value = response.json().await?;
            assert_eq!(body.as_array().map(Vec::len), Some(4));

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn profiles_match_on_gender_and_age_bracket() -> Result<()> {
    oferta_test(
        seed_profiles,
        |TestingTools { test_client, .. }| async move {
            // 10958 days is 30 years and a bit, inside the second bracket.
            let birth_date = (Utc::now().date_naive() - Duration::days(10958))
                .format("%Y-%m-%d")
                .to_string();

            let response = test_client
                .get(&format!(
                    "{}&genero=F&nascimento={}",
                    offers_path(),
                    birth_date
                ))
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::OK);
            let body: serde_json::Value = response.json().await?;
            assert_eq!(body, json!([{"ordem": 1, "oferta": "OFERTA-PERFIL"}]));

            // Without a birth date there is no bracket, so only the profile
            // row with no bracket matches.
            let response = test_client
                .get(&format!("{}&genero=F", offers_path()))
                .send()
                .await?;
            assert_eq!(response.status(), StatusCode::OK);
            let body: serde_json::Value = response.json().await?;
            assert_eq!(body, json!([{"ordem": 1, "oferta": "OFERTA-SEM-FAIXA"}]));

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn placeholder_birth_dates_count_as_unset() -> Result<()> {
    oferta_test(
        |settings| {
            settings.source = CandidateSourceConfig::Memory(MemoryConfig {
                profile_offers: vec![ProfileOfferRow {
                    campaign_id: CAMPAIGN.to_string(),
                    local_id: SITE,
                    genero: None,
                    faixa_etaria: None,
                    ordem: 1,
                    offer_id: "OFERTA-ANON".to_string(),
                }],
                ..MemoryConfig::default()
            });
        },
        |TestingTools { test_client, .. }| async move {
            let response = test_client
                .get(&format!("{}&nascimento=0000-00-00", offers_path()))
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::OK);
            let body: serde_json::Value = response.json().await?;
            assert_eq!(body, json!([{"ordem": 1, "oferta": "OFERTA-ANON"}]));

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn an_empty_gender_is_a_value_not_an_absence() -> Result<()> {
    oferta_test(
        |settings| {
            settings.source = CandidateSourceConfig::Memory(MemoryConfig {
                profile_offers: vec![
                    ProfileOfferRow {
                        campaign_id: CAMPAIGN.to_string(),
                        local_id: SITE,
                        genero: Some(String::new()),
                        faixa_etaria: None,
                        ordem: 1,
                        offer_id: "OFERTA-VAZIO".to_string(),
                    },
                    ProfileOfferRow {
                        campaign_id: CAMPAIGN.to_string(),
                        local_id: SITE,
                        genero: None,
                        faixa_etaria: None,
                        ordem: 2,
                        offer_id: "OFERTA-ANON".to_string(),
                    },
                ],
                ..MemoryConfig::default()
            });
        },
        |TestingTools { test_client, .. }| async move {
            let response = test_client
                .get(&format!("{}&genero=", offers_path()))
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::OK);
            let body: serde_json::Value = response.json().await?;
            assert_eq!(body, json!([{"ordem": 1, "oferta": "OFERTA-VAZIO"}]));

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn invalid_birth_dates_are_logged_and_counted() -> Result<()> {
    oferta_test(
        |_| (),
        |TestingTools {
             test_client,
             mut log_watcher,
             mut metrics_watcher,
             ..
         }| async move {
            let response = test_client
                .get(&format!("{}&nascimento=31%2F12%2F1990", offers_path()))
                .send()
                .await?;

            assert_eq!(response.status(), StatusCode::OK);
            assert!(
                log_watcher.has(|event| event.field_contains("message", "Ignoring birth date"))
            );
            assert!(metrics_watcher.has(|msg| {
                msg.name == "request.bad-birthdate"
                    && matches!(msg.metric, Metric::Counter(Counter { value, .. }) if value == 1.0)
            }));

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn the_number_of_offers_provided_is_reported() -> Result<()> {
    oferta_test(
        seed_all_tiers,
        |TestingTools {
             test_client,
             mut metrics_watcher,
             ..
         }| async move {
            let response = test_client.get(&offers_path()).send().await?;
            assert_eq!(response.status(), StatusCode::OK);

            assert!(metrics_watcher.has_histogram("request.offers-per", 4.0));

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn request_durations_are_reported() -> Result<()> {
    oferta_test(
        |_| (),
        |TestingTools {
             test_client,
             mut metrics_watcher,
             ..
         }| async move {
            let response = test_client.get(&offers_path()).send().await?;
            assert_eq!(response.status(), StatusCode::OK);

            assert!(metrics_watcher.has(|msg| msg.name == "request.duration"));

            Ok(())
        },
    )
    .await
}
