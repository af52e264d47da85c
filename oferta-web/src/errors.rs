//! Any errors that oferta-web might generate, and supporting implementations.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use backtrace::Backtrace;
use oferta_ranking::{CandidateError, SetupError};
use serde_json::Value;
use thiserror::Error;

/// The standard error for the web handlers.
pub struct HandlerError {
    /// The wrapped error value.
    kind: HandlerErrorKind,
    /// The backtrace related to the wrapped error.
    pub(crate) backtrace: Backtrace,
}

/// An error that happened in a web handler.
///
/// The display strings of the request validation and query variants are the
/// messages that clients of the previous generation of this service already
/// parse. Don't change them.
#[derive(Error, Debug)]
pub enum HandlerErrorKind {
    /// One of the required request parameters is missing or empty.
    #[error("Parâmetros 'campanha', 'celular' e 'local_id' são obrigatórios.")]
    MissingRequiredParams,

    /// The `local_id` parameter is present but not a number.
    #[error("O parâmetro 'local_id' deve ser um número válido.")]
    InvalidSiteId,

    /// The candidate source failed while answering a lookup.
    #[error("Erro ao executar a consulta: {0}")]
    Ranking(#[from] CandidateError),

    /// The candidate source could not be set up. Deliberately vague in the
    /// response; the details are in the logs.
    #[error("Erro ao inicializar o cliente do ClickHouse.")]
    SourceInit(#[from] SetupError),

    /// A generic error, when there is nothing more specific to say.
    #[error("Internal error")]
    Internal,
}

impl HandlerErrorKind {
    /// Convert the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingRequiredParams | Self::InvalidSiteId => StatusCode::BAD_REQUEST,
            Self::Ranking(_) | Self::SourceInit(_) | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<HandlerErrorKind> for actix_web::Error {
    fn from(kind: HandlerErrorKind) -> Self {
        let error: HandlerError = kind.into();
        error.into()
    }
}

impl HandlerError {
    /// Access the wrapped error.
    pub fn kind(&self) -> &HandlerErrorKind {
        &self.kind
    }

    /// Get a `HandlerError` representing an `Internal` error.
    pub fn internal() -> Self {
        HandlerErrorKind::Internal.into()
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.kind.source()
    }
}

impl<T> From<T> for HandlerError
where
    HandlerErrorKind: From<T>,
{
    fn from(item: T) -> Self {
        HandlerError {
            kind: HandlerErrorKind::from(item),
            backtrace: Backtrace::new(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::fmt::Debug for HandlerError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        // Sentry scans the printed debug information to determine the "event
        // type" to display and to group events by. Format the name of this
        // debug struct as `HandlerError/<error name>` so different kinds
        // don't get grouped together.
        fmt.debug_struct(&format!("HandlerError/{:?}", &self.kind))
            .field("kind", &self.kind)
            .field("backtrace", &self.backtrace)
            .finish()
    }
}

impl ResponseError for HandlerError {
    fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HashMap::new();
        response.insert(
            "error".to_owned(),
            Value::String(format!("{}", self.kind())),
        );
        HttpResponse::build(self.status_code()).json(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn validation_messages_match_the_published_contract() {
        assert_eq!(
            HandlerErrorKind::MissingRequiredParams.to_string(),
            "Parâmetros 'campanha', 'celular' e 'local_id' são obrigatórios."
        );
        assert_eq!(
            HandlerErrorKind::InvalidSiteId.to_string(),
            "O parâmetro 'local_id' deve ser um número válido."
        );
        assert_eq!(
            HandlerErrorKind::SourceInit(SetupError::InvalidConfiguration(anyhow::anyhow!(
                "details stay out of the response"
            )))
            .to_string(),
            "Erro ao inicializar o cliente do ClickHouse."
        );
    }

    #[test]
    fn query_errors_carry_the_underlying_message() {
        let kind =
            HandlerErrorKind::Ranking(CandidateError::Backend(anyhow::anyhow!("boom")));
        let message = kind.to_string();
        assert!(message.starts_with("Erro ao executar a consulta: "));
        assert!(message.contains("boom"));
    }

    #[test]
    fn statuses_follow_the_kind() {
        assert_eq!(
            HandlerErrorKind::MissingRequiredParams.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HandlerErrorKind::InvalidSiteId.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HandlerErrorKind::Internal.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let error: HandlerError = HandlerErrorKind::InvalidSiteId.into();
        let response = error.error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
