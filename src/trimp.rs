//! Banister training impulse (TRIMP)
//!
//! `TRIMP = minutes × HRr × 0.64 × e^(k × HRr)` with the heart rate reserve
//! fraction `HRr = (hr - rest) / (max - rest)` clamped to [0, 1] and
//! `k = 1.92` for men, `1.67` for women.

use tracing::warn;

use crate::models::{Activity, AthleteProfile, Gender, MaxHeartRateFormula, StreamType};

const BASE_MULTIPLIER: f64 = 0.64;
const MALE_EXPONENTIAL_FACTOR: f64 = 1.92;
const FEMALE_EXPONENTIAL_FACTOR: f64 = 1.67;

/// Fraction of the heart rate reserve used at `heart_rate`
pub fn heart_rate_reserve_fraction(heart_rate: f64, resting: f64, max: f64) -> f64 {
    let reserve = max - resting;
    if !(reserve > 0.0) || !heart_rate.is_finite() {
        return 0.0;
    }
    ((heart_rate - resting) / reserve).clamp(0.0, 1.0)
}

/// Banister TRIMP for a stretch of `duration_minutes` at a constant reserve fraction
pub fn banister_trimp(duration_minutes: f64, reserve_fraction: f64, gender: Option<Gender>) -> f64 {
    if duration_minutes <= 0.0 {
        return 0.0;
    }
    // Unknown gender uses the male constant
    let factor = match gender {
        Some(Gender::Female) => FEMALE_EXPONENTIAL_FACTOR,
        _ => MALE_EXPONENTIAL_FACTOR,
    };
    duration_minutes * reserve_fraction * BASE_MULTIPLIER * (factor * reserve_fraction).exp()
}

/// Computes per-activity TRIMP from heart rate data and the athlete profile
#[derive(Debug, Clone)]
pub struct TrimpCalculator {
    max_heart_rate_formula: MaxHeartRateFormula,
    default_resting_heart_rate: u16,
}

impl Default for TrimpCalculator {
    fn default() -> Self {
        TrimpCalculator {
            max_heart_rate_formula: MaxHeartRateFormula::default(),
            default_resting_heart_rate: 60,
        }
    }
}

impl TrimpCalculator {
    pub fn new(max_heart_rate_formula: MaxHeartRateFormula, default_resting_heart_rate: u16) -> Self {
        TrimpCalculator {
            max_heart_rate_formula,
            default_resting_heart_rate,
        }
    }

    /// TRIMP of one activity.
    ///
    /// Prefers the heart rate stream, summing per-sample impulses; falls back
    /// to the average heart rate. Activities without moving time or heart
    /// rate data, or athletes without a known max heart rate, yield 0.
    pub fn activity_trimp(&self, activity: &Activity, athlete: &AthleteProfile) -> f64 {
        if activity.moving_time_seconds == 0 {
            return 0.0;
        }

        let Some(max_hr) = athlete.max_heart_rate_at(activity.start_date, self.max_heart_rate_formula)
        else {
            warn!(
                activity_id = %activity.id,
                "Max heart rate unknown, activity contributes no TRIMP"
            );
            return 0.0;
        };
        let resting_hr = f64::from(
            athlete
                .resting_heart_rate
                .unwrap_or(self.default_resting_heart_rate),
        );

        let moving_minutes = f64::from(activity.moving_time_seconds) / 60.0;
        let impulse = |minutes: f64, hr: f64| {
            banister_trimp(
                minutes,
                heart_rate_reserve_fraction(hr, resting_hr, max_hr),
                athlete.gender,
            )
        };

        match activity.stream(StreamType::HeartRate) {
            Some(hr) if !hr.is_empty() => match activity.stream(StreamType::Time) {
                Some(time) if time.len() == hr.len() && hr.len() >= 2 => time
                    .windows(2)
                    .zip(&hr[1..])
                    .map(|(t, &bpm)| impulse((t[1] - t[0]).max(0.0) / 60.0, bpm))
                    .sum(),
                _ => {
                    let minutes_per_sample = moving_minutes / hr.len() as f64;
                    hr.iter().map(|&bpm| impulse(minutes_per_sample, bpm)).sum()
                }
            },
            _ => activity
                .average_heart_rate
                .map(|avg| impulse(moving_minutes, avg))
                .unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityStreams, SportType};
    use chrono::NaiveDate;

    fn create_test_athlete() -> AthleteProfile {
        AthleteProfile {
            birth_date: None,
            max_heart_rate: Some(190),
            resting_heart_rate: Some(50),
            gender: Some(Gender::Male),
        }
    }

    fn create_test_activity(moving_time_seconds: u32, average_heart_rate: Option<f64>) -> Activity {
        Activity {
            id: "trimp_activity".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 9, 23).unwrap(),
            sport_type: SportType::Run,
            moving_time_seconds,
            distance: 10000.0,
            average_heart_rate,
            streams: ActivityStreams::new(),
        }
    }

    #[test]
    fn test_reserve_fraction() {
        assert!((heart_rate_reserve_fraction(120.0, 50.0, 190.0) - 0.5).abs() < 1e-12);
        assert_eq!(heart_rate_reserve_fraction(40.0, 50.0, 190.0), 0.0);
        assert_eq!(heart_rate_reserve_fraction(210.0, 50.0, 190.0), 1.0);
        assert_eq!(heart_rate_reserve_fraction(150.0, 190.0, 190.0), 0.0);
    }

    #[test]
    fn test_banister_formula() {
        let male = banister_trimp(60.0, 0.5, Some(Gender::Male));
        let expected = 60.0 * 0.5 * 0.64 * (1.92f64 * 0.5).exp();
        assert!((male - expected).abs() < 1e-9);

        let female = banister_trimp(60.0, 0.5, Some(Gender::Female));
        assert!(female < male);
        assert_eq!(banister_trimp(0.0, 0.5, None), 0.0);
    }

    #[test]
    fn test_average_heart_rate_fallback() {
        let calculator = TrimpCalculator::default();
        let activity = create_test_activity(3600, Some(120.0));

        let trimp = calculator.activity_trimp(&activity, &create_test_athlete());
        let expected = banister_trimp(60.0, 0.5, Some(Gender::Male));
        assert!((trimp - expected).abs() < 1e-9);
    }

    #[test]
    fn test_stream_matches_constant_average() {
        let calculator = TrimpCalculator::default();
        let mut activity = create_test_activity(3600, None);
        activity.streams = ActivityStreams::new()
            .with(StreamType::HeartRate, vec![120.0; 3601])
            .with(StreamType::Time, (0..=3600).map(f64::from).collect());

        let trimp = calculator.activity_trimp(&activity, &create_test_athlete());
        let expected = banister_trimp(60.0, 0.5, Some(Gender::Male));
        assert!((trimp - expected).abs() < 1e-6);
    }

    #[test]
    fn test_zero_moving_time() {
        let calculator = TrimpCalculator::default();
        let activity = create_test_activity(0, Some(150.0));
        assert_eq!(calculator.activity_trimp(&activity, &create_test_athlete()), 0.0);
    }

    #[test]
    fn test_no_heart_rate_data() {
        let calculator = TrimpCalculator::default();
        let activity = create_test_activity(3600, None);
        assert_eq!(calculator.activity_trimp(&activity, &create_test_athlete()), 0.0);
    }

    #[test]
    fn test_age_based_max_heart_rate() {
        let calculator = TrimpCalculator::new(MaxHeartRateFormula::Fox, 60);
        let athlete = AthleteProfile {
            birth_date: Some(NaiveDate::from_ymd_opt(1994, 1, 1).unwrap()),
            ..AthleteProfile::default()
        };
        // max 190, rest 60, hr 125 gives HRr 0.5
        let activity = create_test_activity(3600, Some(125.0));

        let trimp = calculator.activity_trimp(&activity, &athlete);
        let expected = banister_trimp(60.0, 0.5, None);
        assert!((trimp - expected).abs() < 1e-9);

        let unknown = AthleteProfile::default();
        assert_eq!(calculator.activity_trimp(&activity, &unknown), 0.0);
    }
}
