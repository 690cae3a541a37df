//! Fastest split over fixed distances within one activity

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Activity, BestEffort, SportType, StreamType};

/// Target distances for one sport type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestEffortRule {
    pub sport_type: SportType,
    /// Target distances in meters
    pub distances: Vec<f64>,
}

/// Versioned table of best effort target distances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestEffortConfig {
    pub rules: Vec<BestEffortRule>,
}

const RUN_DISTANCES: [f64; 13] = [
    400.0, 805.0, 1000.0, 1609.0, 3219.0, 5000.0, 10000.0, 15000.0, 16093.0, 20000.0, 21097.0,
    30000.0, 42195.0,
];

const RIDE_DISTANCES: [f64; 11] = [
    1000.0, 5000.0, 10000.0, 20000.0, 40000.0, 50000.0, 80000.0, 90000.0, 100000.0, 160934.0,
    180000.0,
];

impl Default for BestEffortConfig {
    fn default() -> Self {
        let rule = |sport_type, distances: &[f64]| BestEffortRule {
            sport_type,
            distances: distances.to_vec(),
        };

        BestEffortConfig {
            rules: vec![
                rule(SportType::Run, &RUN_DISTANCES),
                rule(SportType::TrailRun, &RUN_DISTANCES),
                rule(SportType::VirtualRun, &RUN_DISTANCES),
                rule(SportType::Ride, &RIDE_DISTANCES),
                rule(SportType::VirtualRide, &RIDE_DISTANCES),
                rule(SportType::GravelRide, &RIDE_DISTANCES),
                rule(SportType::MountainBikeRide, &RIDE_DISTANCES),
                rule(SportType::EBikeRide, &RIDE_DISTANCES),
            ],
        }
    }
}

impl BestEffortConfig {
    /// Target distances for a sport, empty when the sport has none
    pub fn distances_for(&self, sport_type: SportType) -> &[f64] {
        self.rules
            .iter()
            .find(|r| r.sport_type == sport_type)
            .map(|r| r.distances.as_slice())
            .unwrap_or_default()
    }
}

/// Minimum elapsed time needed to cover `target` meters anywhere in the activity.
///
/// `distance` and `time` must be index-aligned and non-decreasing. Returns
/// `None` when no window reaches the target.
pub fn fastest_time_for_distance(distance: &[f64], time: &[f64], target: f64) -> Option<f64> {
    let n = distance.len().min(time.len());
    if n < 2 || !(target > 0.0) {
        return None;
    }

    let mut best: Option<f64> = None;
    let mut start = 0;

    for end in 1..n {
        while start < end && distance[end] - distance[start] >= target {
            let elapsed = time[end] - time[start];
            best = Some(best.map_or(elapsed, |b| b.min(elapsed)));
            start += 1;
        }
    }

    best
}

/// Extracts best efforts for the distances configured per sport type
#[derive(Debug, Clone, Default)]
pub struct BestEffortExtractor {
    config: BestEffortConfig,
}

impl BestEffortExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BestEffortConfig) -> Self {
        BestEffortExtractor { config }
    }

    /// One record per reachable target distance of the activity's sport
    pub fn extract(&self, activity: &Activity) -> Vec<BestEffort> {
        let distances = self.config.distances_for(activity.sport_type);
        if distances.is_empty() {
            debug!(
                activity_id = %activity.id,
                sport_type = ?activity.sport_type,
                "No best effort distances configured"
            );
            return Vec::new();
        }

        let (Some(distance), Some(time)) = (
            activity.stream(StreamType::Distance),
            activity.stream(StreamType::Time),
        ) else {
            debug!(activity_id = %activity.id, "Missing distance or time stream");
            return Vec::new();
        };

        distances
            .iter()
            .filter_map(|&target| {
                fastest_time_for_distance(distance, time, target).map(|time_in_seconds| {
                    BestEffort {
                        activity_id: activity.id.clone(),
                        sport_type: activity.sport_type,
                        distance_in_meter: target,
                        time_in_seconds,
                    }
                })
            })
            .collect()
    }
}
