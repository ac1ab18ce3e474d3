use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Source columns probed for the record date, highest priority first.
pub const DATE_HEADERS: [&str; 5] = ["Date", "date", "DATE", "Created", "Timestamp"];

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Parses a raw cell into a calendar date, dropping any time of day.
/// Ambiguous slash dates are read month first.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }

    // Fractional seconds are common in sheet exports.
    let without_fraction = raw.split('.').next().unwrap_or(raw);
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(without_fraction, format) {
            return Some(dt.date());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

pub fn iso_week(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

pub fn month_name(date: NaiveDate) -> String {
    date.format("%B").to_string()
}

pub fn quarter(date: NaiveDate) -> u32 {
    (date.month0() / 3) + 1
}

/// Calendar position of an English month name, for ordering option lists.
pub fn month_index(name: &str) -> Option<u32> {
    (1..=12).find(|month| {
        NaiveDate::from_ymd_opt(2000, *month, 1)
            .map(month_name)
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_common_export_formats() {
        assert_eq!(parse_date("2024-01-05"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date(" 2024/01/05 "), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("01/05/2024"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05 17:45:00"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05 17:45:00.250"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05T23:59:59+05:00"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("5-Jan-2024"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("January 5, 2024"), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date("bad-date"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2024-13-40"), None);
    }

    #[test]
    fn derives_week_month_quarter() {
        let date = ymd(2024, 12, 30);
        assert_eq!(iso_week(date), 1);
        assert_eq!(month_name(date), "December");
        assert_eq!(quarter(date), 4);

        assert_eq!(quarter(ymd(2024, 3, 31)), 1);
        assert_eq!(quarter(ymd(2024, 4, 1)), 2);
        assert_eq!(iso_week(ymd(2021, 1, 3)), 53);
    }

    #[test]
    fn month_index_orders_names() {
        assert_eq!(month_index("January"), Some(1));
        assert_eq!(month_index("september"), Some(9));
        assert_eq!(month_index("Smarch"), None);
    }
}
