//! Tests the debug pages.
#![cfg(test)]

use crate::{oferta_test, TestingTools};
use anyhow::Result;
use oferta_settings::{CandidateSourceConfig, ClickHouseConfig, TableFamily};
use reqwest::StatusCode;
use std::time::Duration;

#[actix_rt::test]
async fn cant_use_debug_settings_route_when_debug_is_false() -> Result<()> {
    oferta_test(
        |settings| settings.debug = false,
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/debug/settings").send().await?;

            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(response.content_length(), Some(0));

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn can_use_debug_settings_route_when_debug_is_true() -> Result<()> {
    oferta_test(
        |settings| settings.debug = true,
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/debug/settings").send().await?;

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.headers().get("content-type").unwrap(),
                &"application/json"
            );
            assert!(response.json::<serde_json::Value>().await.is_ok());

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn settings_dumps_mask_the_source_password() -> Result<()> {
    oferta_test(
        |settings| {
            settings.debug = true;
            // The settings page doesn't connect to the source, so the server
            // doesn't have to exist.
            settings.source = CandidateSourceConfig::ClickHouse(ClickHouseConfig {
                url: "http://localhost:8123".to_string(),
                user: "default".to_string(),
                password: "hunter2".to_string(),
                tables: TableFamily::General,
                compression: Default::default(),
                query_timeout: Duration::from_secs(5),
            });
        },
        |TestingTools { test_client, .. }| async move {
            let response = test_client.get("/debug/settings").send().await?;

            assert_eq!(response.status(), StatusCode::OK);
            let body = response.text().await?;
            assert!(!body.contains("hunter2"));
            assert!(body.contains("********"));

            Ok(())
        },
    )
    .await
}
