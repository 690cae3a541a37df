//! Multi-dimensional Ramer–Douglas–Peucker curve simplification
//!
//! Points are `[distance, channel_1, ..]` vectors; deviation is measured in
//! the full N-dimensional space so a spike in any channel is preserved.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::epsilon::{ActivityAggregates, EpsilonEstimator, SimplificationConfig};
use crate::error::CalculationError;
use crate::models::{Activity, StreamType};
use crate::streams::{CurvePoint, StreamCombiner};

/// Simplified curve of one activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifiedCurve {
    /// Tolerance the curve was simplified with
    pub epsilon: f64,
    /// Channels following the leading distance in every point
    pub channels: Vec<StreamType>,
    /// Number of filtered points before simplification
    pub raw_point_count: usize,
    pub points: Vec<CurvePoint>,
}

/// Simplify `points` so that no dropped point deviates more than `epsilon`
/// from the retained polyline. First and last points are always kept.
pub fn simplify(points: &[CurvePoint], epsilon: f64) -> Vec<CurvePoint> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut ranges = vec![(0usize, n - 1)];
    while let Some((start, end)) = ranges.pop() {
        if end <= start + 1 {
            continue;
        }

        let (index, max_distance) = farthest_point(points, start, end);
        if max_distance > epsilon {
            keep[index] = true;
            ranges.push((index, end));
            ranges.push((start, index));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, kept)| kept.then(|| p.clone()))
        .collect()
}

/// Interior point of `[start, end]` farthest from the chord, first one on ties
fn farthest_point(points: &[CurvePoint], start: usize, end: usize) -> (usize, f64) {
    let mut index = start;
    let mut max_distance = 0.0;

    for (i, point) in points.iter().enumerate().take(end).skip(start + 1) {
        let distance = perpendicular_distance(point, &points[start], &points[end]);
        if distance > max_distance {
            index = i;
            max_distance = distance;
        }
    }

    (index, max_distance)
}

/// Euclidean distance from `point` to the segment `line_start..line_end`
pub fn perpendicular_distance(point: &[f64], line_start: &[f64], line_end: &[f64]) -> f64 {
    let direction: Vec<f64> = line_end.iter().zip(line_start).map(|(e, s)| e - s).collect();
    let deviation: Vec<f64> = point.iter().zip(line_start).map(|(p, s)| p - s).collect();

    let length_squared = dot(&direction, &direction);
    let t = if length_squared == 0.0 {
        0.0
    } else {
        (dot(&deviation, &direction) / length_squared).clamp(0.0, 1.0)
    };

    point
        .iter()
        .zip(line_start)
        .zip(&direction)
        .map(|((p, s), d)| {
            let closest = s + t * d;
            (p - closest).powi(2)
        })
        .sum::<f64>()
        .sqrt()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Estimates a tolerance, filters streams and simplifies in one pass
#[derive(Debug, Clone, Default)]
pub struct CurveSimplifier {
    estimator: EpsilonEstimator,
    combiner: StreamCombiner,
}

impl CurveSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SimplificationConfig) -> Self {
        CurveSimplifier {
            combiner: StreamCombiner::new(config.min_moving_velocity),
            estimator: EpsilonEstimator::with_config(config),
        }
    }

    /// Build the simplified curve of an activity over the requested channels
    pub fn simplify_activity(
        &self,
        activity: &Activity,
        channels: &[StreamType],
    ) -> Result<SimplifiedCurve, CalculationError> {
        let aggregates = ActivityAggregates::from_activity(activity);
        let epsilon = self
            .estimator
            .estimate(&aggregates, activity.sport_type.category());

        let combined = self.combiner.combine_activity(activity, channels)?;
        let points = simplify(&combined.points, epsilon);

        debug!(
            activity_id = %activity.id,
            epsilon,
            raw = combined.points.len(),
            simplified = points.len(),
            "Simplified activity curve"
        );

        Ok(SimplifiedCurve {
            epsilon,
            channels: combined.channels,
            raw_point_count: combined.points.len(),
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityStreams, SportType};
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn pts(values: &[(f64, f64)]) -> Vec<CurvePoint> {
        values.iter().map(|&(x, y)| vec![x, y]).collect()
    }

    #[test]
    fn test_fewer_than_three_points_unchanged() {
        let points = pts(&[(0.0, 0.0), (1.0, 5.0)]);
        assert_eq!(simplify(&points, 0.1), points);
        assert!(simplify(&[], 0.1).is_empty());
    }

    #[test]
    fn test_collinear_points_collapse() {
        let points = pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        assert_eq!(simplify(&points, 0.5), pts(&[(0.0, 0.0), (3.0, 3.0)]));
    }

    #[test]
    fn test_spike_retained() {
        let points = pts(&[(0.0, 0.0), (1.0, 0.0), (2.0, 10.0), (3.0, 0.0), (4.0, 0.0)]);
        assert_eq!(simplify(&points, 0.5), points);

        // (1, 0) lies ~0.98 from the chord to the spike
        let simplified = simplify(&points, 1.0);
        assert_eq!(simplified, pts(&[(0.0, 0.0), (2.0, 10.0), (4.0, 0.0)]));

        let coarse = simplify(&points, 20.0);
        assert_eq!(coarse, pts(&[(0.0, 0.0), (4.0, 0.0)]));
    }

    #[test]
    fn test_perpendicular_distance() {
        assert!((perpendicular_distance(&[1.0, 1.0], &[0.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-12);
        // Projection clamps to the segment end
        assert!((perpendicular_distance(&[5.0, 0.0], &[0.0, 0.0], &[2.0, 0.0]) - 3.0).abs() < 1e-12);
        // Degenerate segment measures from the start point
        assert!((perpendicular_distance(&[3.0, 4.0], &[0.0, 0.0], &[0.0, 0.0]) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_three_dimensional_deviation() {
        let points = vec![
            vec![0.0, 0.0, 0.0],
            vec![1.0, 0.0, 3.0],
            vec![2.0, 0.0, 0.0],
        ];
        assert_eq!(simplify(&points, 2.0).len(), 3);
        assert_eq!(simplify(&points, 3.0).len(), 2);
    }

    #[test]
    fn test_simplify_activity_filters_first() {
        let activity = Activity {
            id: "a1".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 9, 23).unwrap(),
            sport_type: SportType::Run,
            moving_time_seconds: 4,
            distance: 300.0,
            average_heart_rate: None,
            streams: ActivityStreams::new()
                .with(StreamType::Distance, vec![0.0, 100.0, 210.0, 300.0])
                .with(StreamType::Velocity, vec![5.0, 5.0, 0.3, 5.0]),
        };

        let curve = CurveSimplifier::new().simplify_activity(&activity, &[]).unwrap();

        assert_eq!(curve.raw_point_count, 3);
        assert_eq!(curve.points.first(), Some(&vec![0.0]));
        assert_eq!(curve.points.last(), Some(&vec![300.0]));
        assert!((0.4..=2.5).contains(&curve.epsilon));
    }

    fn curve_strategy() -> impl Strategy<Value = Vec<CurvePoint>> {
        prop::collection::vec((0.1f64..50.0, -100.0f64..100.0, 0.0f64..400.0), 0..120).prop_map(
            |steps| {
                let mut distance = 0.0;
                steps
                    .into_iter()
                    .map(|(step, a, b)| {
                        distance += step;
                        vec![distance, a, b]
                    })
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn test_larger_epsilon_never_adds_points(
            points in curve_strategy(),
            epsilon in 0.0f64..50.0,
            extra in 0.0f64..50.0,
        ) {
            let fine = simplify(&points, epsilon);
            let coarse = simplify(&points, epsilon + extra);
            prop_assert!(coarse.len() <= fine.len());
        }

        #[test]
        fn test_endpoints_preserved(points in curve_strategy(), epsilon in 0.0f64..50.0) {
            let simplified = simplify(&points, epsilon);
            prop_assert_eq!(simplified.first(), points.first());
            prop_assert_eq!(simplified.last(), points.last());
        }

        #[test]
        fn test_simplification_is_idempotent(points in curve_strategy(), epsilon in 0.0f64..50.0) {
            let once = simplify(&points, epsilon);
            let twice = simplify(&once, epsilon);
            prop_assert_eq!(once, twice);
        }
    }
}
