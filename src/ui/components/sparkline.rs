use crate::fetch::PricePoint;
use crate::ui::SeriesPlot;

const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One-line block sparkline, at most `width` cells wide.
#[derive(Debug, Clone, Copy)]
pub struct SparklinePlot {
    pub width: usize,
}

impl SparklinePlot {
    pub fn new(width: usize) -> Self {
        Self { width }
    }
}

impl SeriesPlot for SparklinePlot {
    type Output = String;

    fn plot(&self, series: &[PricePoint]) -> String {
        if series.is_empty() || self.width == 0 {
            return String::new();
        }

        let samples = resample(series, self.width);
        let (min, max) = samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        let span = max - min;

        samples
            .iter()
            .map(|value| {
                if span <= f64::EPSILON {
                    return LEVELS[LEVELS.len() / 2 - 1];
                }
                let level = ((value - min) / span * (LEVELS.len() - 1) as f64).round() as usize;
                LEVELS[level.min(LEVELS.len() - 1)]
            })
            .collect()
    }
}

/// Average consecutive points into `width` buckets.
fn resample(series: &[PricePoint], width: usize) -> Vec<f64> {
    if series.len() <= width {
        return series.iter().map(|point| point.price).collect();
    }

    (0..width)
        .map(|bucket| {
            let start = bucket * series.len() / width;
            let end = ((bucket + 1) * series.len() / width).max(start + 1);
            let slice = &series[start..end];
            slice.iter().map(|point| point.price).sum::<f64>() / slice.len() as f64
        })
        .collect()
}
