//! Best rolling averages (power curve style) for a single stream
//!
//! Window sizes are derived from the stream's real sampling rate, so a
//! recording with gaps does not get its intervals silently shortened.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Activity, BestAverages, StreamType};

/// Supported interval durations in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestAverageConfig {
    pub intervals: Vec<u32>,
}

impl Default for BestAverageConfig {
    fn default() -> Self {
        BestAverageConfig {
            intervals: vec![
                1, 5, 10, 15, 30, 45, 60, 120, 180, 240, 300, 390, 480, 720, 960, 1200, 1800,
                2400, 3600,
            ],
        }
    }
}

/// Number of samples covering `interval_seconds`.
///
/// Uses the mean sampling interval of the time stream, or 1 Hz when no
/// usable time stream is available.
pub fn window_size(interval_seconds: u32, time: Option<&[f64]>) -> usize {
    let mean_dt = time
        .filter(|t| t.len() >= 2)
        .map(|t| (t[t.len() - 1] - t[0]) / (t.len() - 1) as f64)
        .filter(|dt| dt.is_finite() && *dt > 0.0)
        .unwrap_or(1.0);

    let samples = (f64::from(interval_seconds) / mean_dt).round();
    (samples as usize).max(1)
}

/// Maximum mean of any `window` consecutive values
pub fn max_rolling_average(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }

    let mut sum: f64 = values[..window].iter().sum();
    let mut max_sum = sum;

    for i in window..values.len() {
        sum += values[i] - values[i - window];
        max_sum = max_sum.max(sum);
    }

    Some(max_sum / window as f64)
}

/// Computes best averages for averageable streams
#[derive(Debug, Clone, Default)]
pub struct BestAverageExtractor {
    config: BestAverageConfig,
}

impl BestAverageExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BestAverageConfig) -> Self {
        BestAverageExtractor { config }
    }

    /// Best averages of raw values for every configured interval the stream covers
    pub fn calculate(&self, values: &[f64], time: Option<&[f64]>) -> BestAverages {
        self.config
            .intervals
            .iter()
            .filter_map(|&interval| {
                let window = window_size(interval, time);
                max_rolling_average(values, window).map(|avg| (interval, avg))
            })
            .collect()
    }

    /// Best averages of one activity stream.
    ///
    /// Returns `None` when the stream type does not support averaging or the
    /// activity has no such stream.
    pub fn extract(&self, activity: &Activity, stream_type: StreamType) -> Option<BestAverages> {
        if !stream_type.supports_best_averages() {
            return None;
        }

        let values = activity.stream(stream_type)?;
        let averages = self.calculate(values, activity.stream(StreamType::Time));

        debug!(
            activity_id = %activity.id,
            stream_type = ?stream_type,
            intervals = averages.len(),
            "Calculated best averages"
        );

        Some(averages)
    }

    /// Averageable stream types present on an activity
    pub fn averageable_streams(activity: &Activity) -> Vec<StreamType> {
        activity
            .streams
            .stream_types()
            .filter(|t| t.supports_best_averages())
            .collect()
    }
}
