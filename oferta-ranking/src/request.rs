//! The validated request type and the normalization helpers that produce it.

use crate::AgeBracket;
use chrono::NaiveDate;
use fake::{faker::lorem::en::Word, Fake};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

/// The placeholder birth date that upstream systems emit when the customer's
/// birth date was never collected.
pub const UNSET_BIRTH_DATE: &str = "0000-00-00";

lazy_static! {
    /// Matches every character that is not a decimal digit.
    static ref NON_DIGITS: Regex = Regex::new(r"\D").unwrap();
}

/// A validated request for ranked offers.
///
/// Building one of these is the job of the web layer: it merges query and
/// body parameters, validates the required ones, and derives the optional
/// demographic fields. By the time a request reaches the ranker it is known
/// to be complete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankingRequest {
    /// The campaign the offers are served under.
    pub campaign_id: String,

    /// The customer's phone number, in normalized form (digits only).
    pub phone: String,

    /// The site (store or location) the customer is at.
    pub site_id: i64,

    /// The customer's gender, verbatim from the request. `None` matches only
    /// profile records with no gender recorded.
    pub gender: Option<String>,

    /// The customer's age bracket, derived from their birth date. `None`
    /// matches only profile records with no bracket recorded.
    pub age_bracket: Option<AgeBracket>,
}

impl<F> fake::Dummy<F> for RankingRequest {
    fn dummy_with_rng<R: rand::Rng + ?Sized>(_config: &F, rng: &mut R) -> Self {
        Self {
            campaign_id: Word().fake_with_rng(rng),
            phone: std::iter::repeat_with(|| rng.gen_range(0..=9).to_string())
                .take(11)
                .collect(),
            site_id: rng.gen_range(1..1_000),
            gender: None,
            age_bracket: None,
        }
    }
}

/// Normalize a phone number by removing every character that is not a
/// decimal digit.
///
/// ```
/// # use oferta_ranking::normalize_phone;
/// assert_eq!(normalize_phone("(11) 98888-7777"), "11988887777");
/// ```
pub fn normalize_phone(raw: &str) -> String {
    NON_DIGITS.replace_all(raw, "").into_owned()
}

/// Interpret the raw `nascimento` parameter.
///
/// An empty value and the [`UNSET_BIRTH_DATE`] placeholder both mean "no
/// birth date on file" and produce `Ok(None)`. Anything else must be an ISO
/// date (`1990-12-31` style); values that don't parse are returned as errors
/// so the caller can decide how loudly to ignore them.
pub fn parse_birth_date(raw: &str) -> Result<Option<NaiveDate>, chrono::ParseError> {
    if raw.is_empty() || raw == UNSET_BIRTH_DATE {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn phone_normalization_strips_punctuation() {
        assert_eq!(normalize_phone("(11) 98888-7777"), "11988887777");
        assert_eq!(normalize_phone("+55 11 98888 7777"), "5511988887777");
        assert_eq!(normalize_phone("11988887777"), "11988887777");
    }

    #[test]
    fn phone_normalization_can_empty_the_value() {
        assert_eq!(normalize_phone("n/a"), "");
        assert_eq!(normalize_phone(""), "");
    }

    #[test]
    fn unset_birth_dates_are_not_errors() {
        assert_eq!(parse_birth_date(""), Ok(None));
        assert_eq!(parse_birth_date(UNSET_BIRTH_DATE), Ok(None));
    }

    #[test]
    fn iso_birth_dates_parse() {
        let parsed = parse_birth_date("1990-02-28").expect("date should parse");
        assert_eq!(
            parsed,
            Some(chrono::NaiveDate::from_ymd_opt(1990, 2, 28).unwrap())
        );
    }

    #[test]
    fn garbage_birth_dates_are_errors() {
        assert!(parse_birth_date("31/12/1990").is_err());
        assert!(parse_birth_date("not-a-date").is_err());
        assert!(parse_birth_date("1990-13-40").is_err());
    }
}
