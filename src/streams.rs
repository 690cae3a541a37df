//! Stream filtering and multi-channel point assembly
//!
//! Turns index-aligned streams into `[distance, channel_1, ..]` points,
//! dropping stationary samples along the way.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CalculationError;
use crate::models::{Activity, StreamType};

/// One point of a multi-channel curve, distance first
pub type CurvePoint = Vec<f64>;

/// Filtered points together with the channels they carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedStreams {
    /// Auxiliary channels in point order, after the leading distance
    pub channels: Vec<StreamType>,
    pub points: Vec<CurvePoint>,
}

/// Filters stationary samples and zips streams into points
#[derive(Debug, Clone)]
pub struct StreamCombiner {
    min_moving_velocity: f64,
}

impl Default for StreamCombiner {
    fn default() -> Self {
        StreamCombiner {
            min_moving_velocity: 0.5,
        }
    }
}

impl StreamCombiner {
    pub fn new(min_moving_velocity: f64) -> Self {
        StreamCombiner {
            min_moving_velocity,
        }
    }

    /// Combine raw streams into filtered points.
    ///
    /// Sample `i` is dropped when `moving[i]` is false or `velocity[i]` is
    /// below the stationary threshold, and when its distance does not exceed
    /// the distance of the last kept point. Channel values missing at an
    /// index default to 0.
    pub fn combine(
        &self,
        distance: &[f64],
        moving: Option<&[f64]>,
        velocity: Option<&[f64]>,
        channels: &[&[f64]],
    ) -> Result<Vec<CurvePoint>, CalculationError> {
        if distance.is_empty() {
            return Err(CalculationError::insufficient_data(
                "route curve",
                "distance stream is empty",
            ));
        }

        let mut points: Vec<CurvePoint> = Vec::with_capacity(distance.len());
        for (i, &d) in distance.iter().enumerate() {
            if !self.is_moving_sample(i, moving, velocity) {
                continue;
            }
            // Distance must strictly increase along the curve
            if points.last().is_some_and(|last| d <= last[0]) {
                continue;
            }
            let mut point = Vec::with_capacity(channels.len() + 1);
            point.push(d);
            point.extend(channels.iter().map(|c| c.get(i).copied().unwrap_or(0.0)));
            points.push(point);
        }

        debug!(
            raw = distance.len(),
            kept = points.len(),
            "Filtered stationary samples"
        );

        Ok(points)
    }

    /// Combine the streams of an activity, using the requested channels in order
    pub fn combine_activity(
        &self,
        activity: &Activity,
        channels: &[StreamType],
    ) -> Result<CombinedStreams, CalculationError> {
        let distance = activity.stream(StreamType::Distance).unwrap_or_default();
        let channel_data: Vec<&[f64]> = channels
            .iter()
            .map(|&c| activity.stream(c).unwrap_or_default())
            .collect();

        let points = self.combine(
            distance,
            activity.stream(StreamType::Moving),
            activity.stream(StreamType::Velocity),
            &channel_data,
        )?;

        Ok(CombinedStreams {
            channels: channels.to_vec(),
            points,
        })
    }

    fn is_moving_sample(&self, i: usize, moving: Option<&[f64]>, velocity: Option<&[f64]>) -> bool {
        let stopped = moving
            .and_then(|m| m.get(i))
            .map(|&flag| flag == 0.0)
            .unwrap_or(false);
        let too_slow = velocity
            .and_then(|v| v.get(i))
            .map(|&speed| speed < self.min_moving_velocity)
            .unwrap_or(false);

        !stopped && !too_slow
    }
}
