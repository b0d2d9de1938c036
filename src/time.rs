//! UTC timestamp handling shared by labels, profiles, the sample-time policy
//! and the catalog.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

const LENIENT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%jT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Seconds between the Unix epoch and J2000 (2000-01-01T12:00:00 UTC).
const J2000_UNIX_SECONDS: i64 = 946_728_000;

/// Parse a label timestamp.
///
/// Accepts calendar and day-of-year forms, optional fractional seconds, an
/// optional trailing `Z` and surrounding quotes. Plain dates map to midnight.
pub fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim().trim_matches('"').trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let s = s.strip_suffix('Z').unwrap_or(s);

    LENIENT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Strict catalog timestamp parse: `YYYY-MM-DDTHH:MM:SS.f` with one to six
/// fractional digits and an optional trailing `Z`.
pub fn parse_strict(s: &str) -> Option<DateTime<Utc>> {
    let s = s.strip_suffix('Z').unwrap_or(s);
    let (_, fraction) = s.split_once('.')?;
    if fraction.is_empty() || fraction.len() > 6 || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Format with millisecond precision and a `Z` marker.
pub fn format_millis(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub fn duration_from_seconds(seconds: f64) -> Duration {
    Duration::nanoseconds((seconds * 1e9).round() as i64)
}

/// Seconds past J2000 on the UTC scale.
pub fn to_et(dt: &DateTime<Utc>) -> f64 {
    (dt.timestamp() - J2000_UNIX_SECONDS) as f64 + f64::from(dt.timestamp_subsec_nanos()) * 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Datelike, Timelike};
    use rstest::rstest;

    #[rstest]
    #[case("2018-07-03T06:15:08.832Z")]
    #[case("2018-07-03T06:15:08.832")]
    #[case("\"2018-07-03T06:15:08.832\"")]
    #[case("2018-184T06:15:08.832")]
    fn lenient_forms_agree(#[case] input: &str) {
        let dt = parse_utc(input).unwrap();
        assert_eq!(dt.year(), 2018);
        assert_eq!(dt.ordinal(), 184);
        assert_eq!(dt.second(), 8);
        assert_eq!(dt.timestamp_subsec_millis(), 832);
    }

    #[rstest]
    #[case("2018-07-03T06:15:08.832Z", true)]
    #[case("2018-07-03T06:15:08.832", true)]
    #[case("2018-07-03T06:15:08.8321234Z", false)]
    #[case("2018-07-03T06:15:08Z", false)]
    #[case("2018-184T06:15:08.832", false)]
    fn strict_requires_fraction(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(parse_strict(input).is_some(), ok);
    }

    #[test]
    fn et_is_zero_at_j2000() {
        let j2000 = parse_utc("2000-01-01T12:00:00.000Z").unwrap();
        assert_relative_eq!(to_et(&j2000), 0.0);
        let later = parse_utc("2000-01-01T12:00:10.250Z").unwrap();
        assert_relative_eq!(to_et(&later), 10.25, epsilon = 1e-9);
    }

    #[test]
    fn millis_format_round_trips_through_strict_parse() {
        let dt = parse_utc("2019-01-04T05:01:08.660Z").unwrap() + duration_from_seconds(8.0);
        let text = format_millis(&dt);
        assert_eq!(text, "2019-01-04T05:01:16.660Z");
        assert_eq!(parse_strict(&text), Some(dt));
    }
}
