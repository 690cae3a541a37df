use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stridemetrics::{
    ActivityId, ActivityStreams, AthleteProfile, BatchConfig, BatchRunner, BestAverages,
    BestEffort, Dataset, DerivedStore, EngineConfig, Gender, InMemoryStore, SportType, StreamKey,
    StreamType, TrainingLoadCalculator, TsbInterpretation,
};

/// Integration tests that exercise the complete extraction and load workflows

#[cfg(test)]
mod integration_tests {
    use super::*;
    use stridemetrics::Activity;

    fn create_test_athlete() -> AthleteProfile {
        AthleteProfile {
            birth_date: Some(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()),
            max_heart_rate: Some(190),
            resting_heart_rate: Some(50),
            gender: Some(Gender::Male),
        }
    }

    /// Steady 1 Hz run with a short stop and a faster middle section
    fn create_test_run(id: &str, date: NaiveDate) -> Activity {
        let n = 3000;
        let mut distance = Vec::with_capacity(n);
        let mut velocity = Vec::with_capacity(n);
        let mut total = 0.0;
        for i in 0..n {
            let speed = match i {
                600..=629 => 0.0,
                1500..=1799 => 4.5,
                _ => 3.2,
            };
            total += speed;
            distance.push(total);
            velocity.push(speed);
        }

        Activity {
            id: id.to_string(),
            start_date: date,
            sport_type: SportType::Run,
            moving_time_seconds: (n - 30) as u32,
            distance: total,
            average_heart_rate: Some(150.0),
            streams: ActivityStreams::new()
                .with(StreamType::Distance, distance)
                .with(StreamType::Time, (0..n).map(|i| i as f64).collect())
                .with(StreamType::Velocity, velocity)
                .with(
                    StreamType::HeartRate,
                    (0..n).map(|i| if (1500..1800).contains(&i) { 172.0 } else { 148.0 }).collect(),
                ),
        }
    }

    fn quiet_runner() -> BatchRunner {
        let config = EngineConfig {
            batch: BatchConfig {
                threads: Some(2),
                show_progress: false,
            },
            ..EngineConfig::default()
        };
        BatchRunner::from_engine_config(&config)
    }

    fn day(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap() + Days::new(offset)
    }

    /// Curve simplification drops stationary samples and keeps the endpoints
    #[test]
    fn test_curve_workflow() {
        let activity = create_test_run("run_1", day(0));
        let runner = quiet_runner();

        let curves = runner
            .simplify_curves(std::slice::from_ref(&activity), &[StreamType::HeartRate])
            .unwrap();
        let curve = curves[0].1.as_ref().unwrap();

        assert_eq!(curve.raw_point_count, 2970);
        assert!(curve.points.len() >= 2);
        assert!(curve.points.len() < 50);
        assert!((0.4..=2.5).contains(&curve.epsilon));

        let distance = activity.stream(StreamType::Distance).unwrap();
        assert_eq!(curve.points.first().unwrap()[0], distance[0]);
        assert_eq!(curve.points.last().unwrap()[0], distance[distance.len() - 1]);

        // Heart rate step at the fast section must survive
        assert!(curve.points.iter().any(|p| p[1] == 172.0));
        for pair in curve.points.windows(2) {
            assert!(pair[1][0] > pair[0][0]);
        }
    }

    /// Best efforts and best averages through the cached batch runner
    #[test]
    fn test_extraction_workflow() {
        let activities = vec![
            create_test_run("run_1", day(0)),
            create_test_run("run_2", day(1)),
        ];
        let runner = quiet_runner();
        let mut efforts: InMemoryStore<ActivityId, Vec<BestEffort>> = InMemoryStore::new();
        let mut averages: InMemoryStore<StreamKey, BestAverages> = InMemoryStore::new();

        let summary = runner.run_best_efforts(&activities, &mut efforts).unwrap();
        assert_eq!(summary.computed, 2);

        let run_efforts = efforts.get(&"run_1".to_string()).unwrap();
        let one_k = run_efforts
            .iter()
            .find(|e| e.distance_in_meter == 1000.0)
            .unwrap();
        // 1000 m inside the 4.5 m/s section
        assert!((one_k.time_in_seconds - 1000.0 / 4.5).abs() <= 1.0);
        assert!(run_efforts.iter().all(|e| e.distance_in_meter <= 10000.0));

        let summary = runner.run_best_averages(&activities, &mut averages).unwrap();
        assert_eq!(summary.computed, 2);
        let hr = averages
            .get(&StreamKey::new("run_2", StreamType::HeartRate))
            .unwrap();
        assert_eq!(hr.get(&60), Some(&172.0));
        assert_eq!(hr.get(&300), Some(&172.0));
        assert!(hr.get(&3600).is_none());

        // A second run only picks up new activities
        let mut more = activities.clone();
        more.push(create_test_run("run_3", day(2)));
        let summary = runner.run_best_efforts(&more, &mut efforts).unwrap();
        assert_eq!(summary.skipped_cached, 2);
        assert_eq!(summary.computed, 1);
        assert!(efforts.exists(&"run_3".to_string()));
    }

    /// Training load over a realistic block with a rest week
    #[test]
    fn test_training_load_workflow() {
        let athlete = create_test_athlete();
        let activities: Vec<Activity> = (0..70)
            .filter(|d| d % 7 != 6 && !(56..63).contains(d))
            .map(|d| create_test_run(&format!("run_{}", d), day(d)))
            .collect();

        let calculator = TrainingLoadCalculator::new();
        let report = calculator
            .calculate(&activities, &athlete, day(69))
            .unwrap();

        assert_eq!(report.metrics.len(), 70);
        assert_eq!(report.metrics.first().unwrap().date, day(0));
        assert_eq!(report.metrics.last().unwrap().date, day(69));

        // Dates are consecutive without gaps
        for pair in report.metrics.windows(2) {
            assert_eq!(pair[0].date + Days::new(1), pair[1].date);
        }

        // Rest week drains fatigue faster than fitness
        let before_rest = &report.metrics[55];
        let end_of_rest = &report.metrics[62];
        assert!(end_of_rest.atl < before_rest.atl);
        assert!(end_of_rest.tsb > before_rest.tsb);

        let summary = &report.summary;
        assert!(summary.latest.ctl > Decimal::ZERO);
        assert_eq!(summary.rest_days_last_week, 1);
        assert!(summary.monotony > dec!(0));
        assert_eq!(summary.strain, summary.weekly_trimp * summary.monotony);
        assert_eq!(
            summary.tsb_interpretation,
            TsbInterpretation::from_tsb(summary.latest.tsb)
        );
    }

    /// Today far after the last activity still produces a point for today
    #[test]
    fn test_training_load_gap_to_today() {
        let athlete = create_test_athlete();
        let activities = vec![create_test_run("run_1", day(0))];

        let report = TrainingLoadCalculator::new()
            .calculate(&activities, &athlete, day(30))
            .unwrap();

        assert_eq!(report.metrics.len(), 31);
        let latest = &report.summary.latest;
        assert_eq!(latest.date, day(30));
        assert_eq!(latest.trimp, Decimal::ZERO);
        assert_eq!(report.summary.weekly_trimp, Decimal::ZERO);
        assert_eq!(report.summary.monotony, Decimal::ZERO);
        assert_eq!(report.summary.rest_days_last_week, 7);
    }

    /// Dataset JSON round trip into the engine
    #[test]
    fn test_dataset_workflow() {
        let dataset = Dataset {
            athlete: create_test_athlete(),
            activities: vec![create_test_run("run_1", day(0))],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        std::fs::write(&path, serde_json::to_string(&dataset).unwrap()).unwrap();

        let loaded = Dataset::from_json_file(&path).unwrap();
        assert_eq!(loaded, dataset);
        assert!(loaded.activities[0].check_stream_lengths().is_ok());
    }
}
