use crate::fetch::Candle;

/// Summary figures shown next to the history chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryIndicators {
    pub min_volume: f64,
    pub max_volume: f64,
    pub mean_volume: f64,
    pub min_close: f64,
    pub max_close: f64,
}

impl HistoryIndicators {
    /// `None` for an empty window.
    pub fn from_candles(candles: &[Candle]) -> Option<Self> {
        let first = candles.first()?;
        let mut indicators = Self {
            min_volume: first.volume,
            max_volume: first.volume,
            mean_volume: 0.0,
            min_close: first.close,
            max_close: first.close,
        };

        let mut total_volume = 0.0;
        for candle in candles {
            indicators.min_volume = indicators.min_volume.min(candle.volume);
            indicators.max_volume = indicators.max_volume.max(candle.volume);
            indicators.min_close = indicators.min_close.min(candle.close);
            indicators.max_close = indicators.max_close.max(candle.close);
            total_volume += candle.volume;
        }
        indicators.mean_volume = total_volume / candles.len() as f64;

        Some(indicators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::history::candle_on;
    use chrono::NaiveDate;

    #[test]
    fn summarises_window() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let candles = vec![
            candle_on(day, 10.0, 11.0, 300.0),
            candle_on(day.succ_opt().unwrap(), 11.0, 9.5, 100.0),
            candle_on(day.succ_opt().unwrap().succ_opt().unwrap(), 9.5, 12.0, 200.0),
        ];

        let indicators = HistoryIndicators::from_candles(&candles).unwrap();
        assert_eq!(indicators.min_volume, 100.0);
        assert_eq!(indicators.max_volume, 300.0);
        assert_eq!(indicators.mean_volume, 200.0);
        assert_eq!(indicators.min_close, 9.5);
        assert_eq!(indicators.max_close, 12.0);
    }

    #[test]
    fn empty_window_has_no_indicators() {
        assert!(HistoryIndicators::from_candles(&[]).is_none());
    }
}
