//! Tests the service's logging.
#![cfg(test)]

use crate::{oferta_test, TestingTools};
use anyhow::Result;
use serde_json::json;

#[actix_rt::test]
async fn error_handler_writes_logs() -> Result<()> {
    oferta_test(
        |_| (),
        |TestingTools {
             test_client,
             mut log_watcher,
             ..
         }| async move {
            let response = test_client.get("/__error__").send().await?;

            assert!(response.status().is_server_error());
            assert!(
                log_watcher.has(|event| event.field_contains("message", "Request server error"))
            );

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn request_logs_redact_the_phone_number_by_default() -> Result<()> {
    oferta_test(
        |_| (),
        |TestingTools {
             test_client,
             mut log_watcher,
             ..
         }| async move {
            let response = test_client
                .get("/api/oferta?campanha=natal&celular=11988887777&local_id=42")
                .send()
                .await?;

            assert!(response.status().is_success());
            assert!(log_watcher.has(|event| {
                event.field_contains("message", "Offer request")
                    && event.field_contains("campanha", "natal")
                    && event.fields.get("celular") == Some(&json!(""))
            }));

            Ok(())
        },
    )
    .await
}

#[actix_rt::test]
async fn request_logs_include_the_phone_number_when_configured() -> Result<()> {
    oferta_test(
        |settings| settings.log_full_request = true,
        |TestingTools {
             test_client,
             mut log_watcher,
             ..
         }| async move {
            let response = test_client
                .get("/api/oferta?campanha=natal&celular=11988887777&local_id=42")
                .send()
                .await?;

            assert!(response.status().is_success());
            assert!(log_watcher.has(|event| {
                event.field_contains("message", "Offer request")
                    && event.fields.get("celular") == Some(&json!("11988887777"))
            }));

            Ok(())
        },
    )
    .await
}
