//! Two-Line Element (TLE) set parsing.
//!
//! TLE sets are the standard format for distributing satellite mean
//! elements, consumed by the SGP4 propagation model. Fields live at fixed
//! columns in two 69-character lines; satellite numbers above 99 999 use
//! the Alpha-5 scheme, where the leading digit becomes a letter.
//!
//! # Example TLE
//!
//! ```text
//! ISS (ZARYA)
//! 1 25544U 98067A   20206.18539600  .00001406  00000-0  33518-4 0  9992
//! 2 25544  51.6461 339.8014 0001473  94.8340 265.2864 15.49309432236008
//! ```

use log::warn;
use uom::si::angle::radian;
use uom::si::f64::Angle;

use crate::constants::TWO_PI;
use crate::error::{Error, Result};
use crate::time::Epoch;

/// Minutes per day, for mean-motion unit conversions.
const MINUTES_PER_DAY: f64 = 1440.0;

/// A parsed two-line element set.
///
/// Angles are stored in radians; the mean motion in revolutions per day as
/// transmitted. [`Tle::mean_motion_radians_per_minute`] gives the SGP4
/// input form.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tle {
    /// NORAD catalog number (Alpha-5 decoded).
    pub satellite_number: u32,
    /// Security classification (`U`, `C`, or `S`).
    pub classification: char,
    /// International designator (launch year, number, piece).
    pub international_designator: String,
    /// Epoch of the element set.
    pub epoch: Epoch,
    /// First derivative of mean motion over two, rev/day².
    pub mean_motion_dot: f64,
    /// Second derivative of mean motion over six, rev/day³.
    pub mean_motion_ddot: f64,
    /// B* drag term, 1/Earth-radii.
    pub bstar: f64,
    /// Element set number.
    pub element_number: u32,
    /// Inclination, radians.
    pub inclination: f64,
    /// Right ascension of the ascending node, radians.
    pub right_ascension: f64,
    /// Eccentricity.
    pub eccentricity: f64,
    /// Argument of perigee, radians.
    pub argument_of_perigee: f64,
    /// Mean anomaly, radians.
    pub mean_anomaly: f64,
    /// Mean motion, revolutions per day.
    pub mean_motion: f64,
    /// Revolution number at epoch.
    pub revolution_number: u32,
}

impl Tle {
    /// Parse an element set from its two lines.
    ///
    /// The mod-10 checksum in column 69 is verified but tolerated: a
    /// mismatch logs a warning rather than rejecting the set, since
    /// hand-edited TLEs with stale checksums are common in practice.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTle`] when a line is short, has the wrong line
    /// number, or a field does not parse.
    pub fn from_lines(line1: &str, line2: &str) -> Result<Self> {
        check_line(line1, 1, '1')?;
        check_line(line2, 2, '2')?;

        let satellite_number = parse_satellite_number(&line1[2..7], 1)?;
        let satellite_number_2 = parse_satellite_number(&line2[2..7], 2)?;
        if satellite_number != satellite_number_2 {
            return Err(Error::InvalidTle {
                line: 2,
                reason: format!(
                    "satellite number {satellite_number_2} does not match line 1 ({satellite_number})"
                ),
            });
        }

        let classification = line1.chars().nth(7).unwrap_or('U');
        let international_designator = line1[9..17].trim().to_string();

        let epoch_year: i32 = field(line1, 1, 18..20, "epoch year")?;
        let epoch_year = if epoch_year < 57 { 2000 + epoch_year } else { 1900 + epoch_year };
        let epoch_day: f64 = field(line1, 1, 20..32, "epoch day")?;
        let epoch = Epoch::from_day_of_year(epoch_year, epoch_day);

        let mean_motion_dot: f64 = field(line1, 1, 33..43, "mean motion derivative")?;
        let mean_motion_ddot = parse_exponent_field(&line1[44..52], 1, "second derivative")?;
        let bstar = parse_exponent_field(&line1[53..61], 1, "B*")?;
        let element_number: u32 = field(line1, 1, 64..68, "element number")?;

        let inclination: f64 = field(line2, 2, 8..16, "inclination")?;
        let right_ascension: f64 = field(line2, 2, 17..25, "right ascension")?;
        let eccentricity: f64 = field(line2, 2, 26..33, "eccentricity")
            .map(|mantissa: f64| mantissa * 1e-7)?;
        let argument_of_perigee: f64 = field(line2, 2, 34..42, "argument of perigee")?;
        let mean_anomaly: f64 = field(line2, 2, 43..51, "mean anomaly")?;
        let mean_motion: f64 = field(line2, 2, 52..63, "mean motion")?;
        let revolution_number: u32 = field(line2, 2, 63..68, "revolution number")?;

        for (line, text) in [(1_u8, line1), (2, line2)] {
            if !checksum_matches(text) {
                warn!("TLE line {line} checksum mismatch for satellite {satellite_number}");
            }
        }

        Ok(Self {
            satellite_number,
            classification,
            international_designator,
            epoch,
            mean_motion_dot,
            mean_motion_ddot,
            bstar,
            element_number,
            inclination: inclination.to_radians(),
            right_ascension: right_ascension.to_radians(),
            eccentricity,
            argument_of_perigee: argument_of_perigee.to_radians(),
            mean_anomaly: mean_anomaly.to_radians(),
            mean_motion,
            revolution_number,
        })
    }

    /// Mean motion in the SGP4 input unit, rad/min (Kozai convention).
    #[must_use]
    pub fn mean_motion_radians_per_minute(&self) -> f64 {
        self.mean_motion * TWO_PI / MINUTES_PER_DAY
    }

    /// Inclination as a unit-safe angle.
    #[must_use]
    pub fn inclination_angle(&self) -> Angle {
        Angle::new::<radian>(self.inclination)
    }

    /// Right ascension of the ascending node as a unit-safe angle.
    #[must_use]
    pub fn right_ascension_angle(&self) -> Angle {
        Angle::new::<radian>(self.right_ascension)
    }

    /// Orbital period implied by the mean motion, seconds.
    #[must_use]
    pub fn period(&self) -> f64 {
        86400.0 / self.mean_motion
    }
}

fn check_line(line: &str, number: u8, expected_first: char) -> Result<()> {
    if line.len() < 69 {
        return Err(Error::InvalidTle {
            line: number,
            reason: format!("expected 69 columns, got {}", line.len()),
        });
    }
    if !line.starts_with(expected_first) {
        return Err(Error::InvalidTle {
            line: number,
            reason: format!("line must begin with '{expected_first}'"),
        });
    }
    Ok(())
}

/// Decode a satellite number field, honoring the Alpha-5 extension: a
/// leading letter (`A`–`Z`, skipping `I` and `O`) encodes 10–33 as the
/// leading two digits.
fn parse_satellite_number(text: &str, line: u8) -> Result<u32> {
    let text = text.trim();
    let mut chars = text.chars();
    let first = chars.next().ok_or_else(|| Error::InvalidTle {
        line,
        reason: "empty satellite number".into(),
    })?;
    if first.is_ascii_alphabetic() {
        let letter = first.to_ascii_uppercase();
        if letter == 'I' || letter == 'O' {
            return Err(Error::InvalidTle {
                line,
                reason: format!("'{letter}' is not a valid Alpha-5 prefix"),
            });
        }
        let mut value = letter as u32 - 'A' as u32 + 10;
        // Skip the gaps left by I and O.
        if letter > 'I' {
            value -= 1;
        }
        if letter > 'O' {
            value -= 1;
        }
        let rest: u32 = chars.as_str().parse().map_err(|_| Error::InvalidTle {
            line,
            reason: format!("bad satellite number '{text}'"),
        })?;
        Ok(value * 10_000 + rest)
    } else {
        text.parse().map_err(|_| Error::InvalidTle {
            line,
            reason: format!("bad satellite number '{text}'"),
        })
    }
}

/// Parse a `±MMMMM±E` field with an assumed leading decimal point, the
/// TLE encoding for B* and the second mean-motion derivative.
fn parse_exponent_field(text: &str, line: u8, name: &str) -> Result<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0.0);
    }
    let (mantissa_text, exponent_text) = text
        .rfind(['+', '-'])
        .filter(|&i| i > 0)
        .map(|i| (&text[..i], &text[i..]))
        .unwrap_or((text, "+0"));
    let negative = mantissa_text.starts_with('-');
    let digits = mantissa_text.trim_start_matches(['+', '-']);
    let mantissa: f64 = format!("0.{digits}").parse().map_err(|_| Error::InvalidTle {
        line,
        reason: format!("bad {name} field '{text}'"),
    })?;
    let exponent: i32 = exponent_text.parse().map_err(|_| Error::InvalidTle {
        line,
        reason: format!("bad {name} exponent '{text}'"),
    })?;
    let signed = if negative { -mantissa } else { mantissa };
    Ok(signed * 10f64.powi(exponent))
}

fn field<T: std::str::FromStr>(
    line: &str,
    number: u8,
    columns: std::ops::Range<usize>,
    name: &str,
) -> Result<T> {
    line[columns]
        .trim()
        .parse()
        .map_err(|_| Error::InvalidTle { line: number, reason: format!("bad {name} field") })
}

/// NORAD mod-10 checksum: digits count as themselves, '-' as one,
/// everything else as zero.
fn checksum_matches(line: &str) -> bool {
    let Some(expected) = line.chars().nth(68).and_then(|c| c.to_digit(10)) else {
        return false;
    };
    let sum: u32 = line
        .chars()
        .take(68)
        .map(|c| match c {
            '-' => 1,
            d => d.to_digit(10).unwrap_or(0),
        })
        .sum();
    sum % 10 == expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::Datelike;

    const ISS_1: &str = "1 25544U 98067A   20206.18539600  .00001406  00000-0  33518-4 0  9992";
    const ISS_2: &str = "2 25544  51.6461 339.8014 0001473  94.8340 265.2864 15.49309432236008";

    #[test]
    fn parses_the_iss_element_set() {
        let tle = Tle::from_lines(ISS_1, ISS_2).unwrap();
        assert_eq!(tle.satellite_number, 25544);
        assert_eq!(tle.classification, 'U');
        assert_eq!(tle.international_designator, "98067A");
        assert_abs_diff_eq!(tle.inclination.to_degrees(), 51.6461, epsilon = 1e-9);
        assert_abs_diff_eq!(tle.eccentricity, 0.000_147_3, epsilon = 1e-12);
        assert_abs_diff_eq!(tle.bstar, 0.335_18e-4, epsilon = 1e-12);
        assert_abs_diff_eq!(tle.mean_motion, 15.493_094_32, epsilon = 1e-9);
        assert_eq!(tle.revolution_number, 23600);
        let dt = tle.epoch.to_datetime();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2020, 7, 24));
    }

    #[test]
    fn epoch_year_pivot() {
        // Satellite 00005 is a 1958 launch; epoch year 00 maps to 2000.
        let line1 = "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753";
        let line2 = "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667";
        let tle = Tle::from_lines(line1, line2).unwrap();
        assert_eq!(tle.epoch.to_datetime().year(), 2000);
        assert_abs_diff_eq!(tle.eccentricity, 0.185_966_7, epsilon = 1e-12);
    }

    #[test]
    fn alpha5_satellite_numbers_decode() {
        // 'T' encodes 27: T1234 → 271234.
        let mut line1 = ISS_1.to_string();
        line1.replace_range(2..7, "T1234");
        let mut line2 = ISS_2.to_string();
        line2.replace_range(2..7, "T1234");
        let tle = Tle::from_lines(&line1, &line2).unwrap();
        assert_eq!(tle.satellite_number, 271_234);
    }

    #[test]
    fn alpha5_rejects_i_and_o() {
        let mut line1 = ISS_1.to_string();
        line1.replace_range(2..7, "I1234");
        assert!(matches!(
            Tle::from_lines(&line1, ISS_2),
            Err(Error::InvalidTle { line: 1, .. })
        ));
    }

    #[test]
    fn mismatched_satellite_numbers_are_rejected() {
        let mut line2 = ISS_2.to_string();
        line2.replace_range(2..7, "25545");
        assert!(Tle::from_lines(ISS_1, &line2).is_err());
    }

    #[test]
    fn short_or_mislabeled_lines_are_rejected() {
        assert!(Tle::from_lines("1 25544U", ISS_2).is_err());
        assert!(Tle::from_lines(ISS_2, ISS_1).is_err());
    }

    #[test]
    fn exponent_fields_parse() {
        assert_abs_diff_eq!(
            parse_exponent_field(" 33518-4", 1, "test").unwrap(),
            0.335_18e-4,
            epsilon = 1e-15
        );
        assert_abs_diff_eq!(
            parse_exponent_field("-11606-4", 1, "test").unwrap(),
            -0.116_06e-4,
            epsilon = 1e-15
        );
        assert_abs_diff_eq!(parse_exponent_field(" 00000-0", 1, "test").unwrap(), 0.0);
        assert_abs_diff_eq!(parse_exponent_field("", 1, "test").unwrap(), 0.0);
    }

    #[test]
    fn checksum_detects_corruption() {
        assert!(checksum_matches(ISS_1));
        let corrupted = ISS_1.replace("9992", "9991");
        assert!(!checksum_matches(&corrupted));
    }
}
