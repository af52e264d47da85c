//! Age brackets, the coarse age categories used by profile lookups.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The coarse age category of a customer, as stored in the profile tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeBracket {
    /// 27 years old or younger.
    F1,
    /// 28 through 37 years old.
    F2,
    /// 38 through 47 years old.
    F3,
    /// 48 years old or older.
    F4,
}

impl AgeBracket {
    /// Classify a birth date into a bracket, as of `today`.
    ///
    /// Age in whole years is computed as `round(days / 365)`, with halves
    /// rounding away from zero. Leap days are deliberately not accounted for,
    /// so near a bracket boundary the result can differ by one year from the
    /// calendar age. The bracket tables are populated with the same
    /// arithmetic, so the two sides agree.
    ///
    /// A birth date in the future produces a negative age, which lands in
    /// [`AgeBracket::F1`].
    pub fn classify(birth_date: NaiveDate, today: NaiveDate) -> Self {
        let days = (today - birth_date).num_days();
        let age = (days as f64 / 365.0).round() as i64;
        match age {
            a if a <= 27 => Self::F1,
            a if a <= 37 => Self::F2,
            a if a <= 47 => Self::F3,
            _ => Self::F4,
        }
    }

    /// The bracket's name as stored in the profile tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::F1 => "F1",
            Self::F2 => "F2",
            Self::F3 => "F3",
            Self::F4 => "F4",
        }
    }
}

impl fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The error returned when parsing an unrecognized age bracket name.
#[derive(Debug, thiserror::Error)]
#[error("unrecognized age bracket: {0:?}")]
pub struct ParseAgeBracketError(String);

impl FromStr for AgeBracket {
    type Err = ParseAgeBracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "F1" => Ok(Self::F1),
            "F2" => Ok(Self::F2),
            "F3" => Ok(Self::F3),
            "F4" => Ok(Self::F4),
            other => Err(ParseAgeBracketError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AgeBracket;
    use chrono::NaiveDate;
    use parameterized::parameterized;

    /// Builds a date or panics. Test helper.
    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("invalid date in test")
    }

    #[parameterized(birth_year = {
        1998, 1995, 1988, 1985, 1978, 1975, 1960
    }, expected = {
        AgeBracket::F1, AgeBracket::F2, AgeBracket::F2, AgeBracket::F3,
        AgeBracket::F3, AgeBracket::F4, AgeBracket::F4
    })]
    fn brackets_follow_thresholds(birth_year: i32, expected: AgeBracket) {
        let today = date(2025, 6, 15);
        assert_eq!(AgeBracket::classify(date(birth_year, 6, 15), today), expected);
    }

    #[test]
    fn exactly_27_years_is_f1() {
        // 9862 days over 27 years, which is 27.02 after dividing by 365.
        let today = date(2025, 6, 15);
        assert_eq!(
            AgeBracket::classify(date(1998, 6, 15), today),
            AgeBracket::F1
        );
    }

    #[test]
    fn leap_days_can_push_an_age_over_a_boundary() {
        // Born 1997-06-16, so 27 years and 364 days old. 10226 days / 365
        // rounds to 28, one more than the calendar age.
        let today = date(2025, 6, 15);
        assert_eq!(
            AgeBracket::classify(date(1997, 6, 16), today),
            AgeBracket::F2
        );
    }

    #[test]
    fn future_birth_dates_land_in_f1() {
        let today = date(2025, 6, 15);
        assert_eq!(
            AgeBracket::classify(date(2030, 1, 1), today),
            AgeBracket::F1
        );
    }

    #[test]
    fn bracket_names_round_trip() {
        for bracket in [
            AgeBracket::F1,
            AgeBracket::F2,
            AgeBracket::F3,
            AgeBracket::F4,
        ] {
            assert_eq!(bracket.as_str().parse::<AgeBracket>().unwrap(), bracket);
        }
        assert!("F5".parse::<AgeBracket>().is_err());
    }
}
