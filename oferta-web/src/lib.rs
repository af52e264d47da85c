#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! # Oferta Web
//!
//! The web server of the offer service. It owns the HTTP surface: the
//! ranking endpoint under `/api/oferta`, the operational endpoints required
//! by our deployment environment, and the debug endpoints.
//!
//! Everything interesting about ranking itself lives in [`oferta_ranking`];
//! this crate translates between HTTP and that domain.

mod debug;
mod dockerflow;
mod errors;
mod extractors;
mod logging;
mod middleware;
mod offers;
mod sources;

use crate::logging::RequestSpanBuilder;
use actix_cors::Cors;
use actix_web::{
    dev::Server,
    get,
    http::header,
    web::{self, Data},
    App, HttpResponse, HttpServer,
};
use cadence::StatsdClient;
use oferta_settings::Settings;
use sources::CandidateSourceRef;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

/// Run the web server.
///
/// The server will run until the program is stopped or the returned [`Server`]
/// is dropped.
///
/// # Examples
///
/// ```no_run
/// # use cadence::{NopMetricSink, StatsdClient};
/// # use oferta_settings::Settings;
/// # use std::net::TcpListener;
/// # async fn start() -> Result<(), anyhow::Error> {
/// let settings = Settings::load()?;
/// let listener = TcpListener::bind(settings.http.listen)?;
/// let metrics_client = StatsdClient::from_sink("oferta", NopMetricSink);
/// oferta_web::run(listener, metrics_client, settings)?.await?;
/// # Ok(())
/// # }
/// ```
pub fn run(
    listener: TcpListener,
    metrics_client: StatsdClient,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let num_workers = settings.http.workers;

    // One shared handle, so every worker initializes and reuses the same
    // candidate source.
    let source_ref = CandidateSourceRef::default();
    let metrics_client = Data::new(metrics_client);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(Data::new(settings.clone()))
            .app_data(Data::new(source_ref.clone()))
            .app_data(metrics_client.clone())
            .wrap(Cors::permissive())
            .wrap(middleware::Metrics)
            .wrap(middleware::Sentry::default())
            .wrap(TracingLogger::<RequestSpanBuilder>::new())
            .service(web::scope("api/oferta").configure(offers::configure))
            .service(web::scope("debug").configure(debug::configure))
            .service(root_info)
            .service(web::scope("").configure(dockerflow::service))
    })
    .listen(listener)?;

    if let Some(num_workers) = num_workers {
        server = server.workers(num_workers);
    }

    Ok(server.run())
}

/// The root path of the server. Redirects to the public documentation if any
/// is configured.
#[get("/")]
async fn root_info(settings: Data<Settings>) -> HttpResponse {
    match &settings.public_documentation {
        Some(uri) => HttpResponse::Found()
            .insert_header((header::LOCATION, uri.to_string()))
            .finish(),
        None => HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body(concat!(
                "oferta ranks promotional offers for retail campaigns. ",
                "The ranking API is served under /api/oferta. ",
                "No public documentation is configured for this server.",
            )),
    }
}
