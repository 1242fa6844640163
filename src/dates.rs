use chrono::{DateTime, NaiveDate};

/// Parses an ISO-8601 calendar date (`2024-06-05`) or an RFC 3339 timestamp
/// (`2024-06-05T00:00:00.000Z`) into the calendar date it names.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive())
}

/// Human-readable date for itineraries, e.g. `Jun 5, 2024`.
pub fn format_date(value: Option<&str>) -> String {
    match value {
        None => "N/A".to_string(),
        Some(v) if v.trim().is_empty() => "N/A".to_string(),
        Some(v) => match parse_iso_date(v) {
            Some(date) => date.format("%b %-d, %Y").to_string(),
            None => {
                tracing::warn!("unparsable trip date: {}", v);
                "Invalid Date".to_string()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_plain_and_timestamp_dates() {
        assert_eq!(format_date(Some("2024-06-05")), "Jun 5, 2024");
        assert_eq!(format_date(Some("2024-12-25T00:00:00.000Z")), "Dec 25, 2024");
    }

    #[test]
    fn missing_and_bad_dates() {
        assert_eq!(format_date(None), "N/A");
        assert_eq!(format_date(Some("")), "N/A");
        assert_eq!(format_date(Some("next tuesday")), "Invalid Date");
        assert!(parse_iso_date("2024-02-30").is_none());
    }
}
