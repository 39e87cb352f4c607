//! Heart-rate zone calculator.
//!
//! Maps a [`ZoneBand`] and a maximum heart rate to an inclusive
//! `(lower, upper)` band. The maximum rate is derived from the user's age
//! when a birth date is known and falls back to [`DEFAULT_MAX_RATE`]
//! otherwise.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Maximum rate used when no computed maximum is available.
pub const DEFAULT_MAX_RATE: u32 = 190;

/// Age assumed when no birth data is available.
pub const FALLBACK_AGE: u32 = 24;

/// One of five ordered intensity bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneBand {
    Zone1,
    Zone2,
    Zone3,
    Zone4,
    Zone5,
}

impl ZoneBand {
    pub const ALL: [ZoneBand; 5] = [
        ZoneBand::Zone1,
        ZoneBand::Zone2,
        ZoneBand::Zone3,
        ZoneBand::Zone4,
        ZoneBand::Zone5,
    ];

    /// `[lower, upper)` as whole percentages of the maximum rate.
    pub fn percent_range(self) -> (u32, u32) {
        match self {
            ZoneBand::Zone1 => (68, 73),
            ZoneBand::Zone2 => (73, 80),
            ZoneBand::Zone3 => (80, 87),
            ZoneBand::Zone4 => (87, 93),
            ZoneBand::Zone5 => (93, 100),
        }
    }

    /// 1-based band number, as shown to users.
    pub fn number(self) -> u8 {
        match self {
            ZoneBand::Zone1 => 1,
            ZoneBand::Zone2 => 2,
            ZoneBand::Zone3 => 3,
            ZoneBand::Zone4 => 4,
            ZoneBand::Zone5 => 5,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        ZoneBand::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }

    pub fn is_top(self) -> bool {
        self == ZoneBand::Zone5
    }
}

impl Default for ZoneBand {
    fn default() -> Self {
        ZoneBand::Zone3
    }
}

impl std::fmt::Display for ZoneBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (lo, hi) = self.percent_range();
        write!(f, "zone {} ({lo}-{hi}%)", self.number())
    }
}

/// Inclusive heart-rate band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneBounds {
    pub lower: u32,
    pub upper: u32,
}

impl ZoneBounds {
    pub fn contains(&self, reading: u32) -> bool {
        (self.lower..=self.upper).contains(&reading)
    }
}

/// Compute the inclusive band for `zone` at `max_rate`.
///
/// Both bounds are floored; the top band's upper bound is `max_rate` itself.
pub fn boundaries(zone: ZoneBand, max_rate: u32) -> ZoneBounds {
    let (lower_pct, upper_pct) = zone.percent_range();
    let scale = |pct: u32| (u64::from(pct) * u64::from(max_rate) / 100) as u32;
    let upper = if zone.is_top() { max_rate } else { scale(upper_pct) };
    ZoneBounds {
        lower: scale(lower_pct),
        upper,
    }
}

/// Birth year and optional month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthDate {
    pub year: i32,
    #[serde(default)]
    pub month: Option<u32>,
}

/// Whole years between `birth` and `today`. A missing month counts as
/// January.
pub fn age_on(birth: BirthDate, today: NaiveDate) -> u32 {
    let birth_month = birth.month.unwrap_or(1);
    let mut age = today.year() - birth.year;
    if today.month() < birth_month {
        age -= 1;
    }
    age.max(0) as u32
}

/// `208 - 0.7 * age`, floored.
pub fn max_rate_for_age(age: u32) -> u32 {
    // Tenths avoid float rounding: 2080 - 7 * age.
    let tenths = 2080_i64 - 7 * i64::from(age);
    (tenths.max(0) / 10) as u32
}

/// Resolves the maximum heart rate for a profile.
pub struct MaxRate;

impl MaxRate {
    /// Maximum rate from birth data, using [`FALLBACK_AGE`] when it is missing.
    pub fn resolve(birth: Option<BirthDate>, today: NaiveDate) -> u32 {
        let age = birth.map(|b| age_on(b, today)).unwrap_or(FALLBACK_AGE);
        max_rate_for_age(age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_one_at_182() {
        assert_eq!(
            boundaries(ZoneBand::Zone1, 182),
            ZoneBounds { lower: 123, upper: 132 }
        );
    }

    #[test]
    fn zone_five_upper_is_max_rate() {
        assert_eq!(
            boundaries(ZoneBand::Zone5, 182),
            ZoneBounds { lower: 169, upper: 182 }
        );
    }

    #[test]
    fn default_max_rate_bands_are_contiguous() {
        let bands: Vec<_> = ZoneBand::ALL
            .iter()
            .map(|z| boundaries(*z, DEFAULT_MAX_RATE))
            .collect();
        for pair in bands.windows(2) {
            assert_eq!(pair[0].upper, pair[1].lower);
        }
        assert_eq!(bands[4].upper, DEFAULT_MAX_RATE);
    }

    #[test]
    fn bounds_are_inclusive() {
        let b = boundaries(ZoneBand::Zone1, 182);
        assert!(b.contains(123));
        assert!(b.contains(132));
        assert!(!b.contains(122));
        assert!(!b.contains(133));
    }

    #[test]
    fn age_before_and_after_birth_month() {
        let birth = BirthDate { year: 1990, month: Some(6) };
        let before = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let after = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(age_on(birth, before), 33);
        assert_eq!(age_on(birth, after), 34);
    }

    #[test]
    fn missing_month_counts_as_january() {
        let birth = BirthDate { year: 2000, month: None };
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(age_on(birth, today), 24);
    }

    #[test]
    fn max_rate_formula() {
        assert_eq!(max_rate_for_age(0), 208);
        assert_eq!(max_rate_for_age(30), 187);
        // 208 - 0.7 * 37 = 182.1
        assert_eq!(max_rate_for_age(37), 182);
    }

    #[test]
    fn resolve_falls_back_to_fixed_age() {
        let today = NaiveDate::from_ymd_opt(2030, 3, 1).unwrap();
        assert_eq!(MaxRate::resolve(None, today), max_rate_for_age(FALLBACK_AGE));
    }

    #[test]
    fn band_numbers_roundtrip() {
        for zone in ZoneBand::ALL {
            assert_eq!(ZoneBand::from_number(zone.number()), Some(zone));
        }
        assert_eq!(ZoneBand::from_number(0), None);
        assert_eq!(ZoneBand::from_number(6), None);
    }
}
