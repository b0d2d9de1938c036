use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::time;

/// Inclusive UTC time ranges, normalised so that `start <= end`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<[String; 2]>")]
pub struct TimeRanges {
    ranges: Vec<(DateTime<Utc>, DateTime<Utc>)>,
}

impl TimeRanges {
    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.ranges
            .iter()
            .any(|(start, end)| start <= at && at <= end)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }
}

impl TryFrom<Vec<[String; 2]>> for TimeRanges {
    type Error = String;

    fn try_from(raw: Vec<[String; 2]>) -> Result<Self, Self::Error> {
        let ranges = raw
            .iter()
            .map(|[a, b]| {
                let start = time::parse_utc(a).ok_or_else(|| format!("invalid range start '{}'", a))?;
                let end = time::parse_utc(b).ok_or_else(|| format!("invalid range end '{}'", b))?;
                Ok(if start <= end { (start, end) } else { (end, start) })
            })
            .collect::<Result<Vec<_>, String>>()?;
        Ok(Self { ranges })
    }
}
