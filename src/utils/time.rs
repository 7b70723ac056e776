use chrono::{DateTime, Local, NaiveDate, Utc};

pub fn snapshot_timestamp_slug() -> String {
    Local::now().format("%Y_%m_%d_%H_%M").to_string()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Render a trade timestamp in the local timezone.
pub fn format_trade_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_filesystem_safe() {
        let slug = snapshot_timestamp_slug();
        assert_eq!(slug.len(), "2024_01_01_09_30".len());
        assert!(slug.chars().all(|ch| ch.is_ascii_digit() || ch == '_'));
    }

    #[test]
    fn trade_time_has_minute_precision() {
        let formatted = format_trade_time(Utc::now());
        assert_eq!(formatted.len(), "2024-01-01 09:30".len());
    }
}
