//! UTC epochs and sidereal time.
//!
//! An [`Epoch`] is a UTC instant stored as POSIX seconds in a single `f64`.
//! That representation is exact to well under a microsecond over the
//! supported range and makes epoch arithmetic (differences, rolls, ordered
//! comparison) trivial. Conversions to the dynamical time scales used by
//! the precession and nutation models go through a built-in leap-second
//! table.

use chrono::{DateTime, TimeZone, Utc};

use crate::constants::{
    DAYS_PER_CENTURY, J2000_JD, POSIX_EPOCH_JD, SECONDS_PER_DAY, TT_MINUS_TAI,
    TWO_PI,
};
use crate::numerics::wrap_two_pi;

/// Leap seconds in force since 1972, as `(posix_seconds_of_introduction,
/// TAI − UTC)` pairs. Source: IERS Bulletin C.
const LEAP_SECONDS: [(f64, f64); 28] = [
    (63_072_000.0, 10.0),  // 1972-01-01
    (78_796_800.0, 11.0),  // 1972-07-01
    (94_694_400.0, 12.0),  // 1973-01-01
    (126_230_400.0, 13.0), // 1974-01-01
    (157_766_400.0, 14.0), // 1975-01-01
    (189_302_400.0, 15.0), // 1976-01-01
    (220_924_800.0, 16.0), // 1977-01-01
    (252_460_800.0, 17.0), // 1978-01-01
    (283_996_800.0, 18.0), // 1979-01-01
    (315_532_800.0, 19.0), // 1980-01-01
    (362_793_600.0, 20.0), // 1981-07-01
    (394_329_600.0, 21.0), // 1982-07-01
    (425_865_600.0, 22.0), // 1983-07-01
    (489_024_000.0, 23.0), // 1985-07-01
    (567_993_600.0, 24.0), // 1988-01-01
    (631_152_000.0, 25.0), // 1990-01-01
    (662_688_000.0, 26.0), // 1991-01-01
    (709_948_800.0, 27.0), // 1992-07-01
    (741_484_800.0, 28.0), // 1993-07-01
    (773_020_800.0, 29.0), // 1994-07-01
    (820_454_400.0, 30.0), // 1996-01-01
    (867_715_200.0, 31.0), // 1997-07-01
    (915_148_800.0, 32.0), // 1999-01-01
    (1_136_073_600.0, 33.0), // 2006-01-01
    (1_230_768_000.0, 34.0), // 2009-01-01
    (1_341_100_800.0, 35.0), // 2012-07-01
    (1_435_708_800.0, 36.0), // 2015-07-01
    (1_483_228_800.0, 37.0), // 2017-01-01
];

/// A UTC instant, stored as POSIX seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Epoch {
    posix: f64,
}

impl Epoch {
    /// Create an epoch from POSIX seconds (UTC).
    #[must_use]
    pub const fn from_posix_seconds(posix: f64) -> Self {
        Self { posix }
    }

    /// Create an epoch from a civil UTC date and time.
    #[must_use]
    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        let posix = datetime.timestamp() as f64
            + f64::from(datetime.timestamp_subsec_nanos()) * 1e-9;
        Self { posix }
    }

    /// Create an epoch from a year and a 1-based fractional day of year,
    /// the encoding used by two-line element sets.
    #[must_use]
    pub fn from_day_of_year(year: i32, day_of_year: f64) -> Self {
        let jan1 = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
        let seconds = (day_of_year - 1.0) * SECONDS_PER_DAY;
        Self::from_datetime(jan1).roll(seconds)
    }

    /// POSIX seconds (UTC).
    #[must_use]
    pub const fn posix_seconds(&self) -> f64 {
        self.posix
    }

    /// Convert to a civil UTC date and time.
    #[must_use]
    pub fn to_datetime(&self) -> DateTime<Utc> {
        let secs = self.posix.floor();
        let nanos = ((self.posix - secs) * 1e9).round() as u32;
        Utc.timestamp_opt(secs as i64, nanos.min(999_999_999)).unwrap()
    }

    /// Seconds elapsed from `other` to `self`; negative when `self` is
    /// earlier.
    #[must_use]
    pub fn difference(&self, other: &Epoch) -> f64 {
        self.posix - other.posix
    }

    /// A new epoch offset by `seconds` (negative rolls backward).
    #[must_use]
    pub fn roll(&self, seconds: f64) -> Self {
        Self { posix: self.posix + seconds }
    }

    /// TAI − UTC at this epoch, from the built-in leap-second table.
    ///
    /// Epochs before 1972 use the first table entry; epochs after the last
    /// announced leap second use the last.
    #[must_use]
    pub fn leap_seconds(&self) -> f64 {
        let mut offset = LEAP_SECONDS[0].1;
        for &(threshold, value) in &LEAP_SECONDS {
            if self.posix >= threshold {
                offset = value;
            } else {
                break;
            }
        }
        offset
    }

    /// Julian Date on the UTC scale.
    #[must_use]
    pub fn julian_date(&self) -> f64 {
        self.posix / SECONDS_PER_DAY + POSIX_EPOCH_JD
    }

    /// Julian Date on the TT scale.
    #[must_use]
    pub fn julian_date_tt(&self) -> f64 {
        self.julian_date()
            + (self.leap_seconds() + TT_MINUS_TAI) / SECONDS_PER_DAY
    }

    /// Julian centuries past J2000.0 on the UTC scale (UT1 is approximated
    /// by UTC; the sub-second DUT1 correction enters through the EOP
    /// provider where it matters).
    #[must_use]
    pub fn julian_centuries(&self) -> f64 {
        (self.julian_date() - J2000_JD) / DAYS_PER_CENTURY
    }

    /// Julian centuries past J2000.0 on the TT scale.
    #[must_use]
    pub fn julian_centuries_tt(&self) -> f64 {
        (self.julian_date_tt() - J2000_JD) / DAYS_PER_CENTURY
    }

    /// Greenwich Mean Sidereal Time, radians in `[0, 2π)`.
    ///
    /// IAU 1982 model (Vallado, *Fundamentals of Astrodynamics and
    /// Applications*, eq. 3-47).
    #[must_use]
    pub fn gmst(&self) -> f64 {
        let t = self.julian_centuries();
        let seconds = 67310.54841
            + (876_600.0 * 3600.0 + 8_640_184.812_866) * t
            + 0.093104 * t * t
            - 6.2e-6 * t * t * t;
        wrap_two_pi(seconds.rem_euclid(SECONDS_PER_DAY) / SECONDS_PER_DAY * TWO_PI)
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_datetime().format("%Y-%m-%dT%H:%M:%S%.3fZ"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::{Datelike, Timelike};

    fn epoch(s: &str) -> Epoch {
        Epoch::from_datetime(s.parse::<DateTime<Utc>>().unwrap())
    }

    #[test]
    fn datetime_round_trip_preserves_milliseconds() {
        let e = epoch("2017-01-07T05:31:00.243Z");
        assert_eq!(e.to_datetime().timestamp_subsec_millis(), 243);
    }

    #[test]
    fn difference_and_roll_are_inverse() {
        let a = epoch("2017-01-07T05:31:00.243Z");
        let b = a.roll(3600.0);
        assert_abs_diff_eq!(b.difference(&a), 3600.0);
        assert!(b > a);
    }

    #[test]
    fn leap_seconds_step_at_2017() {
        assert_abs_diff_eq!(epoch("2016-12-31T00:00:00Z").leap_seconds(), 36.0);
        assert_abs_diff_eq!(epoch("2017-01-02T00:00:00Z").leap_seconds(), 37.0);
        // Pre-table epochs clamp to the first entry.
        assert_abs_diff_eq!(Epoch::from_posix_seconds(0.0).leap_seconds(), 10.0);
    }

    #[test]
    fn day_of_year_is_one_based() {
        let e = Epoch::from_day_of_year(2020, 206.185_396);
        let dt = e.to_datetime();
        assert_eq!((dt.month(), dt.day()), (7, 24));
        assert_eq!(dt.hour(), 4);
    }

    #[test]
    fn gmst_against_vallado_example() {
        // Vallado example 3-5: 1992-08-20 12:14 UT1,
        // GMST = 152.578787°.
        let e = epoch("1992-08-20T12:14:00Z");
        let expected = 152.578_787_f64.to_radians();
        assert_abs_diff_eq!(e.gmst(), expected, epsilon = 1e-6);
    }

    #[test]
    fn julian_date_of_j2000_noon() {
        let e = epoch("2000-01-01T12:00:00Z");
        assert_abs_diff_eq!(e.julian_date(), 2451545.0, epsilon = 1e-9);
        // TT leads UTC by 32 leap seconds + 32.184 s in 2000.
        assert_abs_diff_eq!(
            e.julian_date_tt(),
            2451545.0 + 64.184 / 86400.0,
            epsilon = 1e-9
        );
    }
}
