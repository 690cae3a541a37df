use chrono::{Days, NaiveDate};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::StrideError;
use crate::models::{Activity, AthleteProfile, MaxHeartRateFormula};
use crate::trimp::TrimpCalculator;

/// Aggregated training impulse for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLoad {
    /// Date of the training day
    pub date: NaiveDate,

    /// Total TRIMP for the day (sum of all activities)
    pub trimp: Decimal,

    /// Total moving time in seconds
    pub duration_seconds: u32,

    /// Duration-weighted TRIMP per minute
    pub intensity: Decimal,

    /// Number of activities on this day, 0 for a rest day
    pub activity_count: u16,
}

impl DailyLoad {
    /// Explicit zero entry for a day without activity
    pub fn rest_day(date: NaiveDate) -> Self {
        DailyLoad {
            date,
            trimp: Decimal::ZERO,
            duration_seconds: 0,
            intensity: Decimal::ZERO,
            activity_count: 0,
        }
    }
}

/// Chronic/acute load and balance for a specific date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetricsPoint {
    pub date: NaiveDate,

    /// Chronic Training Load (42-day exponentially weighted average)
    pub ctl: Decimal,

    /// Acute Training Load (7-day exponentially weighted average)
    pub atl: Decimal,

    /// Training Stress Balance going into the day (previous CTL - previous ATL)
    pub tsb: Decimal,

    /// Daily TRIMP used in the calculation
    pub trimp: Decimal,
}

/// Accumulator carried from one day to the next
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadState {
    pub ctl: Decimal,
    pub atl: Decimal,
}

/// Training load model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingLoadConfig {
    /// CTL time constant in days (default: 42)
    pub ctl_time_constant: u16,

    /// ATL time constant in days (default: 7)
    pub atl_time_constant: u16,

    /// Days before the visible window used to seed CTL/ATL (default: 56)
    pub warm_up_days: u16,

    /// Length of the visible window ending today (default: 365)
    pub visible_days: u16,

    /// Ramp rate calculation period in days
    pub ramp_rate_days: u16,

    /// Trailing window for monotony, strain and rest days (default: 7)
    pub indicator_days: u16,

    /// Resting heart rate used when the athlete has none on file
    pub default_resting_heart_rate: u16,

    /// Formula for max heart rate when the athlete has no explicit value
    pub max_heart_rate_formula: MaxHeartRateFormula,
}

impl Default for TrainingLoadConfig {
    fn default() -> Self {
        TrainingLoadConfig {
            ctl_time_constant: 42,
            atl_time_constant: 7,
            warm_up_days: 56,
            visible_days: 365,
            ramp_rate_days: 7,
            indicator_days: 7,
            default_resting_heart_rate: 60,
            max_heart_rate_formula: MaxHeartRateFormula::Fox,
        }
    }
}

impl TrainingLoadConfig {
    /// Reject constant combinations the model cannot work with
    pub fn validate(&self) -> Result<(), StrideError> {
        if self.ctl_time_constant == 0 || self.atl_time_constant == 0 {
            return Err(StrideError::Configuration(
                "time constants must be positive".to_string(),
            ));
        }
        if self.atl_time_constant > self.ctl_time_constant {
            return Err(StrideError::Configuration(format!(
                "atl_time_constant ({}) must not exceed ctl_time_constant ({})",
                self.atl_time_constant, self.ctl_time_constant
            )));
        }
        if self.warm_up_days < self.atl_time_constant {
            return Err(StrideError::Configuration(format!(
                "warm_up_days ({}) must cover at least atl_time_constant ({})",
                self.warm_up_days, self.atl_time_constant
            )));
        }
        if self.visible_days == 0 || self.indicator_days == 0 {
            return Err(StrideError::Configuration(
                "visible_days and indicator_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Training Stress Balance interpretation ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TsbInterpretation {
    VeryFresh,    // +25 and above
    Fresh,        // +5 to +25
    Neutral,      // -10 to +5
    Fatigued,     // -30 to -10
    VeryFatigued, // Below -30
}

impl TsbInterpretation {
    /// Get TSB interpretation from numeric value
    pub fn from_tsb(tsb: Decimal) -> Self {
        if tsb >= Decimal::from(25) {
            TsbInterpretation::VeryFresh
        } else if tsb >= Decimal::from(5) {
            TsbInterpretation::Fresh
        } else if tsb >= Decimal::from(-10) {
            TsbInterpretation::Neutral
        } else if tsb >= Decimal::from(-30) {
            TsbInterpretation::Fatigued
        } else {
            TsbInterpretation::VeryFatigued
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TsbInterpretation::VeryFresh => "Very fresh (may be losing fitness)",
            TsbInterpretation::Fresh => "Fresh and ready for hard training/racing",
            TsbInterpretation::Neutral => "Neutral (normal training)",
            TsbInterpretation::Fatigued => "Fatigued (monitor closely)",
            TsbInterpretation::VeryFatigued => "Very fatigued (rest needed)",
        }
    }
}

/// Fatigue indicators for the latest day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingLoadSummary {
    pub latest: TrainingMetricsPoint,

    /// ATL / CTL, 0 while CTL is 0
    pub ac_ratio: Decimal,

    /// Mean / population stdev of the trailing week's TRIMP, 0 when stdev is 0
    pub monotony: Decimal,

    /// Weekly TRIMP × monotony
    pub strain: Decimal,

    pub weekly_trimp: Decimal,

    pub rest_days_last_week: u16,

    /// CTL change per week, None until enough history exists
    pub ctl_ramp_rate: Option<Decimal>,

    pub tsb_interpretation: TsbInterpretation,
}

/// Full output of a training load run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingLoadReport {
    pub daily_loads: Vec<DailyLoad>,
    pub metrics: Vec<TrainingMetricsPoint>,
    pub summary: TrainingLoadSummary,
}

/// Core training load calculation engine
#[derive(Debug, Clone)]
pub struct TrainingLoadCalculator {
    config: TrainingLoadConfig,
    trimp: TrimpCalculator,
}

impl TrainingLoadCalculator {
    /// Create new calculator with default configuration
    pub fn new() -> Self {
        Self::with_config(TrainingLoadConfig::default())
    }

    /// Create new calculator with custom configuration
    pub fn with_config(config: TrainingLoadConfig) -> Self {
        let trimp = TrimpCalculator::new(
            config.max_heart_rate_formula,
            config.default_resting_heart_rate,
        );
        TrainingLoadCalculator { config, trimp }
    }

    pub fn config(&self) -> &TrainingLoadConfig {
        &self.config
    }

    /// Aggregate per-activity TRIMP into calendar day buckets.
    ///
    /// Activities without moving time are skipped.
    pub fn aggregate_daily_loads(
        &self,
        activities: &[Activity],
        athlete: &AthleteProfile,
    ) -> BTreeMap<NaiveDate, DailyLoad> {
        let mut daily: BTreeMap<NaiveDate, DailyLoad> = BTreeMap::new();

        for activity in activities.iter().filter(|a| a.moving_time_seconds > 0) {
            let trimp = Decimal::from_f64(self.trimp.activity_trimp(activity, athlete))
                .unwrap_or(Decimal::ZERO);
            let duration = activity.moving_time_seconds;
            let minutes = Decimal::from(duration) / Decimal::from(60);
            let intensity = trimp / minutes;

            let day = daily
                .entry(activity.start_date)
                .or_insert_with(|| DailyLoad::rest_day(activity.start_date));

            let total_duration = day.duration_seconds + duration;
            day.intensity = (day.intensity * Decimal::from(day.duration_seconds)
                + intensity * Decimal::from(duration))
                / Decimal::from(total_duration);
            day.trimp += trimp;
            day.duration_seconds = total_duration;
            day.activity_count += 1;
        }

        daily
    }

    /// Materialize a zero entry for every day from the earliest date through
    /// `today` (or the latest date, if that is later).
    pub fn fill_gaps(
        daily: &BTreeMap<NaiveDate, DailyLoad>,
        today: NaiveDate,
    ) -> BTreeMap<NaiveDate, DailyLoad> {
        let (Some(&first), Some(&last)) = (daily.keys().next(), daily.keys().next_back()) else {
            return BTreeMap::new();
        };
        let end = last.max(today);

        first
            .iter_days()
            .take_while(|date| *date <= end)
            .map(|date| {
                let load = daily
                    .get(&date)
                    .cloned()
                    .unwrap_or_else(|| DailyLoad::rest_day(date));
                (date, load)
            })
            .collect()
    }

    /// Advance the model by one day
    pub fn step(&self, state: LoadState, day: &DailyLoad) -> (LoadState, TrainingMetricsPoint) {
        let ctl_factor = Decimal::ONE / Decimal::from(self.config.ctl_time_constant);
        let atl_factor = Decimal::ONE / Decimal::from(self.config.atl_time_constant);

        let ctl = state.ctl + (day.trimp - state.ctl) * ctl_factor;
        let atl = state.atl + (day.trimp - state.atl) * atl_factor;

        let point = TrainingMetricsPoint {
            date: day.date,
            ctl,
            atl,
            tsb: state.ctl - state.atl,
            trimp: day.trimp,
        };

        (LoadState { ctl, atl }, point)
    }

    /// Fold the model over consecutive days starting from `seed`
    pub fn run_model<'a>(
        &self,
        seed: LoadState,
        days: impl IntoIterator<Item = &'a DailyLoad>,
    ) -> (LoadState, Vec<TrainingMetricsPoint>) {
        days.into_iter()
            .fold((seed, Vec::new()), |(state, mut points), day| {
                let (next, point) = self.step(state, day);
                points.push(point);
                (next, points)
            })
    }

    /// CTL/ATL going into `first_visible`, from the warm-up slice before it
    pub fn seed(&self, daily: &BTreeMap<NaiveDate, DailyLoad>, first_visible: NaiveDate) -> LoadState {
        let warm_up_start = first_visible
            .checked_sub_days(Days::new(u64::from(self.config.warm_up_days)))
            .unwrap_or(NaiveDate::MIN);

        let (seed, warm_up) = self.run_model(
            LoadState::default(),
            daily.range(warm_up_start..first_visible).map(|(_, d)| d),
        );

        debug!(
            warm_up_days = warm_up.len(),
            ctl = %seed.ctl,
            atl = %seed.atl,
            "Seeded training load"
        );
        seed
    }

    /// First day of the visible window ending at `end`
    fn first_visible_day(&self, daily: &BTreeMap<NaiveDate, DailyLoad>, end: NaiveDate) -> Option<NaiveDate> {
        let earliest = *daily.keys().next()?;
        let window_start = end
            .checked_sub_days(Days::new(u64::from(self.config.visible_days.saturating_sub(1))))
            .unwrap_or(earliest);
        Some(earliest.max(window_start))
    }

    /// Metrics series over the visible window of a gap-filled daily map
    pub fn calculate_series(&self, daily: &BTreeMap<NaiveDate, DailyLoad>) -> Vec<TrainingMetricsPoint> {
        let Some(&end) = daily.keys().next_back() else {
            return Vec::new();
        };
        let Some(first_visible) = self.first_visible_day(daily, end) else {
            return Vec::new();
        };

        let seed = self.seed(daily, first_visible);
        let (_, points) = self.run_model(seed, daily.range(first_visible..).map(|(_, d)| d));
        points
    }

    /// Indicators for the latest day of the series
    pub fn summarize(
        &self,
        daily: &BTreeMap<NaiveDate, DailyLoad>,
        metrics: &[TrainingMetricsPoint],
    ) -> Option<TrainingLoadSummary> {
        let latest = metrics.last()?.clone();
        let window: Vec<&DailyLoad> = daily
            .range(..=latest.date)
            .rev()
            .take(usize::from(self.config.indicator_days))
            .map(|(_, d)| d)
            .collect();

        let weekly_trimp: Decimal = window.iter().map(|d| d.trimp).sum();
        let monotony = Self::monotony(&window);
        let rest_days_last_week = window.iter().filter(|d| d.duration_seconds == 0).count() as u16;

        Some(TrainingLoadSummary {
            ac_ratio: Self::ac_ratio(latest.ctl, latest.atl),
            monotony,
            strain: weekly_trimp * monotony,
            weekly_trimp,
            rest_days_last_week,
            ctl_ramp_rate: self.ctl_ramp_rate(metrics),
            tsb_interpretation: TsbInterpretation::from_tsb(latest.tsb),
            latest,
        })
    }

    /// Acute to chronic ratio, guarded against a zero chronic load
    pub fn ac_ratio(ctl: Decimal, atl: Decimal) -> Decimal {
        if ctl.is_zero() {
            Decimal::ZERO
        } else {
            atl / ctl
        }
    }

    /// Mean over population standard deviation of daily TRIMP
    fn monotony(window: &[&DailyLoad]) -> Decimal {
        let values: Vec<f64> = window
            .iter()
            .map(|d| d.trimp.to_f64().unwrap_or(0.0))
            .collect();
        if values.is_empty() {
            return Decimal::ZERO;
        }

        let std_dev = values.iter().population_std_dev();
        if !(std_dev > 0.0) {
            return Decimal::ZERO;
        }

        Decimal::from_f64(values.iter().mean() / std_dev).unwrap_or(Decimal::ZERO)
    }

    /// CTL change per week over the configured ramp period
    fn ctl_ramp_rate(&self, metrics: &[TrainingMetricsPoint]) -> Option<Decimal> {
        let days = usize::from(self.config.ramp_rate_days);
        if days == 0 || metrics.len() <= days {
            return None;
        }

        let recent_ctl = metrics[metrics.len() - 1].ctl;
        let past_ctl = metrics[metrics.len() - 1 - days].ctl;

        let weeks = Decimal::from(days) / Decimal::from(7);
        Some((recent_ctl - past_ctl) / weeks)
    }

    /// Aggregate, gap-fill, seed and model the athlete's activities up to `today`.
    ///
    /// Returns `None` when there is no activity with moving time.
    pub fn calculate(
        &self,
        activities: &[Activity],
        athlete: &AthleteProfile,
        today: NaiveDate,
    ) -> Option<TrainingLoadReport> {
        let daily = Self::fill_gaps(&self.aggregate_daily_loads(activities, athlete), today);
        if daily.is_empty() {
            debug!("No daily loads, skipping training load model");
            return None;
        }

        let metrics = self.calculate_series(&daily);
        let summary = self.summarize(&daily, &metrics)?;

        info!(
            days = daily.len(),
            visible = metrics.len(),
            ctl = %summary.latest.ctl.round_dp(1),
            atl = %summary.latest.atl.round_dp(1),
            "Calculated training load"
        );

        let first_visible = metrics.first().map(|m| m.date);
        Some(TrainingLoadReport {
            daily_loads: daily
                .into_values()
                .filter(|d| first_visible.map_or(true, |first| d.date >= first))
                .collect(),
            metrics,
            summary,
        })
    }
}

impl Default for TrainingLoadCalculator {
    fn default() -> Self {
        Self::new()
    }
}
