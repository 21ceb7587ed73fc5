use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// Parse the calendar date out of whatever the export wrote: bare dates,
/// naive date-times, or RFC 3339 stamps. The time of day is dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = clean_str(raw);
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Arrow `Date32` value (days since the Unix epoch).
pub fn to_date32(d: NaiveDate) -> i32 {
    d.num_days_from_ce() - UNIX_EPOCH_FROM_CE
}

pub fn from_date32(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_FROM_CE)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_common_export_shapes() {
        assert_eq!(parse_date("2020-09-01"), Some(ymd(2020, 9, 1)));
        assert_eq!(parse_date(" \"2020-09-01\" "), Some(ymd(2020, 9, 1)));
        assert_eq!(parse_date("2020-09-01 13:45:00"), Some(ymd(2020, 9, 1)));
        assert_eq!(parse_date("2020/09/01"), Some(ymd(2020, 9, 1)));
        assert_eq!(parse_date("09/01/2020"), Some(ymd(2020, 9, 1)));
        assert_eq!(parse_date("2020-09-01T23:10:00+00:00"), Some(ymd(2020, 9, 1)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2020-13-40"), None);
    }

    #[test]
    fn date32_matches_unix_epoch() {
        assert_eq!(to_date32(ymd(1970, 1, 1)), 0);
        assert_eq!(to_date32(ymd(2020, 9, 1)), 18_506);
        assert_eq!(from_date32(18_506), Some(ymd(2020, 9, 1)));
    }
}
