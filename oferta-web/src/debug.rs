//! Endpoints to help debug running servers. Everything here returns a 404
//! unless the `debug` setting is on.

use actix_web::{get, web, HttpResponse};
use oferta_settings::Settings;

/// Handles the debug endpoints.
pub fn configure(config: &mut web::ServiceConfig) {
    config.service(settings);
}

/// Dump the active settings.
///
/// Secrets are masked by the settings' own serialization, so a dump never
/// contains the ClickHouse password or anything else sensitive.
#[get("settings")]
async fn settings(settings: web::Data<Settings>) -> HttpResponse {
    if settings.debug {
        HttpResponse::Ok().json(settings.as_ref())
    } else {
        HttpResponse::NotFound().body("")
    }
}
