//! Middlewares for using Sentry in the offer service.

use crate::errors::HandlerError;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::Error as ActixError,
};
use futures_util::future::LocalBoxFuture;
use sentry::protocol::Event;
use std::{
    error::Error as StdError,
    future::{ready, Ready},
};

/// Wrapper for Sentry error reporting. A custom middleware instead of
/// `sentry-actix`, so reported events can carry the backtrace captured in
/// [`HandlerError`], which the stock integration cannot see.
#[derive(Debug, Default)]
pub struct Sentry;

impl<S, B> Transform<S, ServiceRequest> for Sentry
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type InitError = ();
    type Transform = SentryMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SentryMiddleware { service }))
    }
}

/// Middleware to catch errors from request handlers and send them to Sentry.
#[derive(Debug)]
pub struct SentryMiddleware<S> {
    /// The wrapped service
    service: S,
}

impl<S> SentryMiddleware<S> {
    /// Custom `sentry::event_from_error` for `HandlerError`
    ///
    /// `sentry::event_from_error` can't access `std::Error` backtraces as its
    /// `backtrace()` method is currently Rust nightly only. This function works
    /// against `HandlerError` instead to access its backtrace.
    pub fn event_from_error(err: &HandlerError) -> Event<'static> {
        let mut exceptions = vec![Self::exception_from_error_with_backtrace(err)];

        let mut source = err.source();
        while let Some(err) = source {
            let exception = if let Some(err) = err.downcast_ref() {
                Self::exception_from_error_with_backtrace(err)
            } else {
                Self::exception_from_error(err)
            };
            exceptions.push(exception);
            source = err.source();
        }

        exceptions.reverse();
        Event {
            exception: exceptions.into(),
            level: sentry::protocol::Level::Error,
            ..Default::default()
        }
    }

    /// Custom `exception_from_error` support function for `HandlerError`
    ///
    /// Based moreso on sentry_failure's `exception_from_single_fail`.
    fn exception_from_error_with_backtrace(err: &HandlerError) -> sentry::protocol::Exception {
        let mut exception = Self::exception_from_error(err);
        // format the stack trace with alternate debug to get addresses
        let bt = format!("{:#?}", err.backtrace);
        exception.stacktrace = sentry_backtrace::parse_stacktrace(&bt);
        exception
    }

    /// Exact copy of sentry's unfortunately private `exception_from_error`
    fn exception_from_error<E: StdError + ?Sized>(err: &E) -> sentry::protocol::Exception {
        let dbg = format!("{:?}", err);
        sentry::protocol::Exception {
            ty: sentry::parse_type_from_debug(&dbg).to_owned(),
            value: Some(err.to_string()),
            ..Default::default()
        }
    }
}

impl<S, B> Service<ServiceRequest> for SentryMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
    S::Future: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    #[tracing::instrument(level = "DEBUG", skip(self, req))]
    fn call(&self, req: ServiceRequest) -> Self::Future {
        let hub = sentry::Hub::current();
        let transaction = if let Some(name) = req.match_name() {
            Some(String::from(name))
        } else {
            req.match_pattern()
        };
        hub.configure_scope(|scope| {
            scope.set_transaction(transaction.as_deref());
        });

        let fut = self.service.call(req);

        Box::pin(async move {
            let response = fut.await?;
            tracing::trace!("checking response for errors");

            match response.response().error() {
                None => (),
                Some(error) => {
                    tracing::trace!(?error, "Found error on response");
                    // Validation failures are routine client errors, only
                    // server errors get reported.
                    let status = error.as_response_error().status_code();
                    if status.is_server_error() {
                        if let Some(handler_error) = error.as_error::<HandlerError>() {
                            hub.capture_event(Self::event_from_error(handler_error));
                        }
                    }
                }
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HandlerErrorKind;
    use oferta_ranking::CandidateError;
    use pretty_assertions::assert_eq;

    /// Stand-in for the wrapped service type, never constructed.
    struct Noop;

    #[test]
    fn event_from_error_reports_the_whole_chain_root_first() {
        let error: HandlerError = HandlerErrorKind::Ranking(CandidateError::Backend(
            anyhow::anyhow!("connection refused"),
        ))
        .into();

        let event = SentryMiddleware::<Noop>::event_from_error(&error);

        assert_eq!(event.level, sentry::protocol::Level::Error);
        let values = &event.exception.values;
        assert_eq!(values.len(), 3);
        assert_eq!(values[0].value.as_deref(), Some("connection refused"));
        assert_eq!(
            values[2].value.as_deref(),
            Some(
                "Erro ao executar a consulta: There was an error querying \
                 the candidate source: connection refused"
            )
        );
    }
}
