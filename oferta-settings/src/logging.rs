//! Settings for log output.

use anyhow::{bail, Context};
use serde::{de, ser::SerializeSeq, Deserialize, Serialize};
use std::{ops::AddAssign, str::FromStr};
use tracing_subscriber::{filter::Directive, EnvFilter};

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// The minimum level that logs should be reported at.
    ///
    /// Each entry can be one of `ERROR`, `WARN`, `INFO`, `DEBUG`, or `TRACE`
    /// (in increasing verbosity), with an optional component that specifies
    /// the source of the logs.
    ///
    /// This setting is combined with the contents of the environment variable
    /// `RUST_LOG`, with values from the environment variable overriding the
    /// config file.
    ///
    /// The environment variable `OFERTA_LOGGING__LEVELS` can be used. This
    /// environment variable will completely override the config file, and will
    /// be merged with the envvar `RUST_LOG`. `RUST_LOG` takes precedence
    /// again.
    ///
    /// # Examples
    ///
    /// The configurations below are identical
    ///
    /// ```yaml
    /// # config/local.yaml
    /// logging:
    ///   levels:
    ///     - INFO                  # default to INFO
    ///     - oferta_web=DEBUG      # noisier logs from oferta_web
    ///     - oferta_ranking=DEBUG  # and from the ranker
    /// ```
    ///
    /// ```shell
    /// RUST_LOG=INFO,oferta_web=DEBUG,oferta_ranking=DEBUG
    /// ```
    pub levels: LogDirectives,

    /// The format to output logs in.
    pub format: LogFormat,
}

/// The shape that log events are written in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// [`tracing-subscriber`]'s human targeted, pretty format. Includes more
    /// information, multiple lines per log event.
    Pretty,

    /// [`tracing-subscriber`]'s default format. One line per log event.
    Compact,

    /// Newline delimited JSON, one object per log event. The format for
    /// production, where a log pipeline consumes the events.
    Json,
}

/// A validated collection of log filter directives.
///
/// Tracing's [`Directive`] object isn't `Clone` or serializable, so settings
/// keep the directives as strings and re-parse them when building a filter.
///
/// This type can be deserialized from either a comma separated string of
/// directives (`"INFO,component1=WARN"`), or from a sequence of comma
/// separated strings (`["INFO", "component1=WARN,component2=DEBUG"]`). This is
/// important because the config files use sequences, but environment variables
/// are always strings.
///
/// Every entry is guaranteed to be parsable as a valid [`Directive`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogDirectives(Vec<String>);

impl Serialize for LogDirectives {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for directive in &self.0 {
            seq.serialize_element(&directive)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for LogDirectives {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        /// Accepts both the string and the sequence encoding.
        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = LogDirectives;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "directive or list of directives")
            }

            fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                s.parse().map_err(|_err| {
                    de::Error::invalid_value(de::Unexpected::Str(s), &"valid directive")
                })
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut rv = LogDirectives(vec![]);

                while let Some(item) = seq.next_element::<String>()? {
                    let parsed: LogDirectives = item.parse().map_err(|err: anyhow::Error| {
                        de::Error::invalid_value(
                            de::Unexpected::Str(&item),
                            &err.to_string().as_str(),
                        )
                    })?;
                    rv += parsed;
                }

                Ok(rv)
            }
        }

        let mut rv = deserializer.deserialize_any(Visitor)?;

        // Add directives from the RUST_LOG env var, which should always be
        // respected.
        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            let from_env: LogDirectives = rust_log.parse().map_err(|_err| {
                de::Error::invalid_value(de::Unexpected::Str(&rust_log), &"valid directive")
            })?;
            rv += from_env;
        }

        Ok(rv)
    }
}

impl FromStr for LogDirectives {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<String> = s.split(',').map(|s| s.to_string()).collect();

        // Test that each part can be parsed as a logging filter directive.
        if let Some(err) = parts.iter().find_map(|p| p.parse::<Directive>().err()) {
            return Err(err).context("valid syntax");
        }

        // Crate targets use underscores. A directive like `oferta-web=DEBUG`
        // parses but never matches anything, so reject it outright.
        if parts.iter().any(|p| p.contains('-')) {
            bail!("log targets must not include hyphens");
        }

        Ok(Self(parts))
    }
}

impl AddAssign for LogDirectives {
    fn add_assign(&mut self, rhs: Self) {
        self.0.extend(rhs.0)
    }
}

impl From<&LogDirectives> for EnvFilter {
    fn from(val: &LogDirectives) -> Self {
        let mut rv = EnvFilter::default();
        for directive in &val.0 {
            // Entries were validated when the wrapper was built.
            rv = rv.add_directive(directive.parse().unwrap());
        }
        rv
    }
}

#[cfg(test)]
mod tests {
    use super::LogDirectives;
    use parameterized::parameterized;
    use pretty_assertions::assert_eq;

    #[test]
    fn string_and_sequence_encodings_agree() {
        let from_string: LogDirectives =
            serde_json::from_value(serde_json::json!("INFO,oferta_web=DEBUG"))
                .expect("could not parse string form");
        let from_sequence: LogDirectives =
            serde_json::from_value(serde_json::json!(["INFO", "oferta_web=DEBUG"]))
                .expect("could not parse sequence form");
        assert_eq!(from_string, from_sequence);
    }

    #[parameterized(input = {
        "oferta_web=FLOOPY",
        "oferta-web=DEBUG",
        "=",
    })]
    fn invalid_directives_are_rejected(input: &str) {
        assert!(input.parse::<LogDirectives>().is_err());
    }

    #[parameterized(input = {
        "INFO",
        "WARN,oferta_web=DEBUG",
        "trace",
    })]
    fn valid_directives_are_accepted(input: &str) {
        assert!(input.parse::<LogDirectives>().is_ok());
    }
}
