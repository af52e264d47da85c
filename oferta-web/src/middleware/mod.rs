//! Middlewares specific to the offer service.

mod metrics;
mod sentry;

pub use self::metrics::Metrics;
pub use self::sentry::Sentry;
