//! Adaptive simplification tolerance
//!
//! Longer and hillier activities tolerate a coarser curve, stop-and-go
//! activities get a tighter one so direction changes survive.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::models::{Activity, ActivityCategory, StreamType};

/// Constants driving the epsilon estimate and the stationary filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplificationConfig {
    /// Base epsilon for foot-based activities (default: 0.5)
    pub foot_base_epsilon: f64,

    /// Base epsilon for every other category (default: 1.0)
    pub default_base_epsilon: f64,

    /// Meters per epsilon unit for foot-based activities (default: 3000)
    pub foot_distance_scaling: f64,

    /// Meters per epsilon unit for rides (default: 8000)
    pub cycling_distance_scaling: f64,

    /// Meters per epsilon unit otherwise (default: 5000)
    pub default_distance_scaling: f64,

    /// Elevation variance per epsilon unit (default: 1000)
    pub elevation_variance_scaling: f64,

    /// Reduction applied to foot-based activities with erratic speed (default: 0.2)
    pub foot_velocity_penalty: f64,

    /// Reduction applied otherwise (default: 0.5)
    pub default_velocity_penalty: f64,

    /// Share of the average speed above which speed variance is erratic (default: 0.2)
    pub velocity_threshold_factor: f64,

    /// Lower bound of the speed variance threshold (default: 0.5)
    pub min_velocity_threshold: f64,

    pub min_epsilon: f64,
    pub max_epsilon: f64,

    /// Samples slower than this (m/s) are dropped as stationary noise (default: 0.5)
    pub min_moving_velocity: f64,
}

impl Default for SimplificationConfig {
    fn default() -> Self {
        SimplificationConfig {
            foot_base_epsilon: 0.5,
            default_base_epsilon: 1.0,
            foot_distance_scaling: 3000.0,
            cycling_distance_scaling: 8000.0,
            default_distance_scaling: 5000.0,
            elevation_variance_scaling: 1000.0,
            foot_velocity_penalty: 0.2,
            default_velocity_penalty: 0.5,
            velocity_threshold_factor: 0.2,
            min_velocity_threshold: 0.5,
            min_epsilon: 0.4,
            max_epsilon: 2.5,
            min_moving_velocity: 0.5,
        }
    }
}

/// Activity level aggregates the estimate is derived from
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityAggregates {
    /// Total distance in meters
    pub total_distance: f64,
    pub elevation_variance: f64,
    /// Average speed in m/s
    pub average_speed: f64,
    pub speed_variance: f64,
}

impl ActivityAggregates {
    /// Derive aggregates from an activity's summary and streams.
    ///
    /// Missing streams leave the matching aggregate at zero.
    pub fn from_activity(activity: &Activity) -> Self {
        let distance_stream = activity.stream(StreamType::Distance).unwrap_or_default();
        let total_distance = if activity.distance > 0.0 {
            activity.distance
        } else {
            distance_stream.last().copied().unwrap_or(0.0)
        };

        let elevation_variance = activity
            .stream(StreamType::Altitude)
            .map(population_variance)
            .unwrap_or(0.0);

        let velocity = activity.stream(StreamType::Velocity).unwrap_or_default();
        let average_speed = if !velocity.is_empty() {
            velocity.iter().mean()
        } else if activity.moving_time_seconds > 0 {
            total_distance / f64::from(activity.moving_time_seconds)
        } else {
            0.0
        };
        let speed_variance = population_variance(velocity);

        ActivityAggregates {
            total_distance,
            elevation_variance,
            average_speed,
            speed_variance,
        }
        .sanitized()
    }

    /// Replace non-finite values with zero
    fn sanitized(self) -> Self {
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        ActivityAggregates {
            total_distance: finite(self.total_distance),
            elevation_variance: finite(self.elevation_variance),
            average_speed: finite(self.average_speed),
            speed_variance: finite(self.speed_variance),
        }
    }
}

fn population_variance(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().population_variance()
}

/// Computes the RDP tolerance for one activity
#[derive(Debug, Clone, Default)]
pub struct EpsilonEstimator {
    config: SimplificationConfig,
}

impl EpsilonEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SimplificationConfig) -> Self {
        EpsilonEstimator { config }
    }

    pub fn config(&self) -> &SimplificationConfig {
        &self.config
    }

    /// Estimate epsilon, always within `[min_epsilon, max_epsilon]`
    pub fn estimate(&self, aggregates: &ActivityAggregates, category: ActivityCategory) -> f64 {
        let aggregates = aggregates.sanitized();
        let config = &self.config;

        let (base_epsilon, distance_scaling, velocity_penalty) = match category {
            ActivityCategory::Foot => (
                config.foot_base_epsilon,
                config.foot_distance_scaling,
                config.foot_velocity_penalty,
            ),
            ActivityCategory::Cycling => (
                config.default_base_epsilon,
                config.cycling_distance_scaling,
                config.default_velocity_penalty,
            ),
            ActivityCategory::Other => (
                config.default_base_epsilon,
                config.default_distance_scaling,
                config.default_velocity_penalty,
            ),
        };

        let velocity_threshold = config
            .min_velocity_threshold
            .max(aggregates.average_speed * config.velocity_threshold_factor);

        let penalty = if aggregates.speed_variance > velocity_threshold {
            velocity_penalty
        } else {
            0.0
        };

        let epsilon = base_epsilon
            + aggregates.total_distance / distance_scaling
            + aggregates.elevation_variance / config.elevation_variance_scaling
            - penalty;

        epsilon.clamp(config.min_epsilon, config.max_epsilon)
    }
}
