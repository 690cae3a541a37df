use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::CalculationError;

/// Identifier of an activity as assigned by the upstream fitness platform
pub type ActivityId = String;

/// Sport types recorded by the upstream platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SportType {
    Run,
    TrailRun,
    VirtualRun,
    Walk,
    Hike,
    Ride,
    VirtualRide,
    GravelRide,
    MountainBikeRide,
    EBikeRide,
    Swim,
    Rowing,
    Workout,
}

/// Coarse grouping of sport types used by the curve simplifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityCategory {
    /// Running, walking, hiking
    Foot,
    /// Any kind of ride
    Cycling,
    Other,
}

impl SportType {
    pub fn category(&self) -> ActivityCategory {
        match self {
            SportType::Run
            | SportType::TrailRun
            | SportType::VirtualRun
            | SportType::Walk
            | SportType::Hike => ActivityCategory::Foot,
            SportType::Ride
            | SportType::VirtualRide
            | SportType::GravelRide
            | SportType::MountainBikeRide
            | SportType::EBikeRide => ActivityCategory::Cycling,
            SportType::Swim | SportType::Rowing | SportType::Workout => ActivityCategory::Other,
        }
    }
}

/// Signal types an activity can carry as an index-aligned stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StreamType {
    /// Cumulative distance in meters
    Distance,
    /// Elapsed time in seconds from activity start
    Time,
    HeartRate,
    Watts,
    /// Velocity in meters per second
    Velocity,
    /// Moving flag, 0.0 for stopped and 1.0 for moving
    Moving,
    Cadence,
    /// Altitude in meters
    Altitude,
}

impl StreamType {
    /// Whether a rolling best average makes sense for this signal
    pub fn supports_best_averages(&self) -> bool {
        matches!(
            self,
            StreamType::Watts | StreamType::HeartRate | StreamType::Cadence
        )
    }
}

impl std::str::FromStr for StreamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "distance" => Ok(StreamType::Distance),
            "time" => Ok(StreamType::Time),
            "heartrate" | "hr" => Ok(StreamType::HeartRate),
            "watts" | "power" => Ok(StreamType::Watts),
            "velocity" | "speed" => Ok(StreamType::Velocity),
            "moving" => Ok(StreamType::Moving),
            "cadence" => Ok(StreamType::Cadence),
            "altitude" => Ok(StreamType::Altitude),
            _ => Err(format!("Invalid stream type: {}", s)),
        }
    }
}

/// All recorded streams of one activity, keyed by signal type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityStreams {
    streams: BTreeMap<StreamType, Vec<f64>>,
}

impl ActivityStreams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, stream_type: StreamType, data: Vec<f64>) -> Self {
        self.insert(stream_type, data);
        self
    }

    pub fn insert(&mut self, stream_type: StreamType, data: Vec<f64>) {
        self.streams.insert(stream_type, data);
    }

    pub fn get(&self, stream_type: StreamType) -> Option<&[f64]> {
        self.streams.get(&stream_type).map(|s| s.as_slice())
    }

    pub fn stream_types(&self) -> impl Iterator<Item = StreamType> + '_ {
        self.streams.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

/// An activity with its summary aggregates and raw streams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Unique identifier for the activity
    pub id: ActivityId,

    /// Calendar date the activity started on
    pub start_date: NaiveDate,

    pub sport_type: SportType,

    /// Moving time in seconds
    pub moving_time_seconds: u32,

    /// Total distance in meters
    #[serde(default)]
    pub distance: f64,

    /// Average heart rate summary, used when no heart rate stream exists
    #[serde(default)]
    pub average_heart_rate: Option<f64>,

    #[serde(default)]
    pub streams: ActivityStreams,
}

impl Activity {
    pub fn stream(&self, stream_type: StreamType) -> Option<&[f64]> {
        self.streams.get(stream_type)
    }

    /// All streams must be index-aligned with the distance stream
    pub fn check_stream_lengths(&self) -> Result<(), CalculationError> {
        let Some(expected) = self.stream(StreamType::Distance).map(<[f64]>::len) else {
            return Ok(());
        };

        match self
            .streams
            .stream_types()
            .filter_map(|t| self.stream(t))
            .find(|s| s.len() != expected)
        {
            Some(stream) => Err(CalculationError::LengthMismatch {
                calculation: format!("activity {}", self.id),
                expected,
                actual: stream.len(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// Age based maximum heart rate formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxHeartRateFormula {
    /// 220 - age
    Fox,
    /// 208 - 0.7 × age
    Tanaka,
    /// 207 - 0.7 × age
    Gellish,
    /// 216.6 - 0.84 × age
    Astrand,
    /// 209.3 - 0.72 × age
    Arena,
}

impl MaxHeartRateFormula {
    pub fn max_heart_rate_for_age(&self, age: u32) -> f64 {
        let age = f64::from(age);
        match self {
            MaxHeartRateFormula::Fox => 220.0 - age,
            MaxHeartRateFormula::Tanaka => 208.0 - 0.7 * age,
            MaxHeartRateFormula::Gellish => 207.0 - 0.7 * age,
            MaxHeartRateFormula::Astrand => 216.6 - 0.84 * age,
            MaxHeartRateFormula::Arena => 209.3 - 0.72 * age,
        }
    }
}

impl Default for MaxHeartRateFormula {
    fn default() -> Self {
        MaxHeartRateFormula::Fox
    }
}

/// Athlete data the training load model depends on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    /// Date of birth for age-based max heart rate
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,

    /// Explicit maximum heart rate, takes precedence over age formulas
    #[serde(default)]
    pub max_heart_rate: Option<u16>,

    #[serde(default)]
    pub resting_heart_rate: Option<u16>,

    #[serde(default)]
    pub gender: Option<Gender>,
}

impl AthleteProfile {
    /// Age in whole years on the given date
    pub fn age_at(&self, on: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        if on < birth {
            return None;
        }
        let mut age = on.year() - birth.year();
        if (on.month(), on.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }

    /// Maximum heart rate in effect on the given date
    pub fn max_heart_rate_at(&self, on: NaiveDate, formula: MaxHeartRateFormula) -> Option<f64> {
        if let Some(max_hr) = self.max_heart_rate {
            return Some(f64::from(max_hr));
        }
        self.age_at(on).map(|age| formula.max_heart_rate_for_age(age))
    }
}

/// An athlete together with their activities, as exported by the importer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub athlete: AthleteProfile,
    pub activities: Vec<Activity>,
}

impl Dataset {
    /// Read a JSON dataset file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }
}

/// Fastest time over a fixed distance within one activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestEffort {
    pub activity_id: ActivityId,
    pub sport_type: SportType,
    pub distance_in_meter: f64,
    pub time_in_seconds: f64,
}

/// Best rolling averages of one stream keyed by interval length in seconds
pub type BestAverages = BTreeMap<u32, f64>;

/// Cache key for the best averages of one stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamKey {
    pub activity_id: ActivityId,
    pub stream_type: StreamType,
}

impl StreamKey {
    pub fn new(activity_id: impl Into<ActivityId>, stream_type: StreamType) -> Self {
        Self {
            activity_id: activity_id.into(),
            stream_type,
        }
    }
}
