//! Parallel per-activity extraction using rayon
//!
//! Cache presence is checked up front, pending work runs on the rayon pool
//! and results are written to the store sequentially afterwards.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::best_average::BestAverageExtractor;
use crate::best_effort::BestEffortExtractor;
use crate::config::EngineConfig;
use crate::error::{CalculationError, Result, StrideError};
use crate::models::{Activity, ActivityId, BestAverages, BestEffort, StreamKey, StreamType};
use crate::simplify::{CurveSimplifier, SimplifiedCurve};
use crate::store::DerivedStore;

/// Configuration for batch runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of worker threads, rayon default (number of CPUs) when unset
    pub threads: Option<usize>,
    /// Show progress bar during a run
    pub show_progress: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            threads: None,
            show_progress: true,
        }
    }
}

/// Summary of one batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Work items considered (activities or activity streams)
    pub total: usize,
    /// Items computed in this run
    pub computed: usize,
    /// Items already present in the store
    pub skipped_cached: usize,
    pub duration_ms: u128,
}

impl BatchSummary {
    /// Items computed per second
    pub fn throughput_per_sec(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.computed as f64 / self.duration_ms as f64) * 1000.0
    }

    pub fn to_string_pretty(&self) -> String {
        format!(
            "Batch Summary\n  \
             Total: {}\n  \
             Computed: {}\n  \
             Cached: {}\n  \
             Total Time: {:.2}s",
            self.total,
            self.computed,
            self.skipped_cached,
            self.duration_ms as f64 / 1000.0,
        )
    }
}

/// Runs the per-activity extractors over many activities
#[derive(Debug, Clone, Default)]
pub struct BatchRunner {
    pub config: BatchConfig,
    efforts: BestEffortExtractor,
    averages: BestAverageExtractor,
    simplifier: CurveSimplifier,
}

impl BatchRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner with every extractor configured from an engine configuration
    pub fn from_engine_config(config: &EngineConfig) -> Self {
        Self {
            config: config.batch.clone(),
            efforts: BestEffortExtractor::with_config(config.best_efforts.clone()),
            averages: BestAverageExtractor::with_config(config.best_averages.clone()),
            simplifier: CurveSimplifier::with_config(config.simplification.clone()),
        }
    }

    /// Extract best efforts for every activity not yet in `store`
    #[tracing::instrument(skip_all, fields(activities = activities.len()))]
    pub fn run_best_efforts<S>(&self, activities: &[Activity], store: &mut S) -> Result<BatchSummary>
    where
        S: DerivedStore<ActivityId, Vec<BestEffort>>,
    {
        let start = Instant::now();
        let pending: Vec<&Activity> = activities
            .iter()
            .filter(|a| !store.exists(&a.id))
            .collect();
        let skipped_cached = activities.len() - pending.len();

        debug!(pending = pending.len(), skipped_cached, "Scheduling best efforts");

        let progress = self.progress_bar(pending.len(), "best efforts");
        let results: Vec<(ActivityId, Vec<BestEffort>)> = self.in_pool(|| {
            pending
                .par_iter()
                .map(|activity| {
                    let efforts = self.efforts.extract(activity);
                    if let Some(pb) = &progress {
                        pb.inc(1);
                    }
                    (activity.id.clone(), efforts)
                })
                .collect()
        })?;
        finish(progress);

        let computed = results.len();
        for (activity_id, efforts) in results {
            store.put(activity_id, efforts);
        }

        let summary = BatchSummary {
            total: activities.len(),
            computed,
            skipped_cached,
            duration_ms: start.elapsed().as_millis(),
        };
        info!("{}", summary.to_string_pretty());
        Ok(summary)
    }

    /// Extract best averages for every averageable stream not yet in `store`
    #[tracing::instrument(skip_all, fields(activities = activities.len()))]
    pub fn run_best_averages<S>(&self, activities: &[Activity], store: &mut S) -> Result<BatchSummary>
    where
        S: DerivedStore<StreamKey, BestAverages>,
    {
        let start = Instant::now();
        let candidates: Vec<(&Activity, StreamType)> = activities
            .iter()
            .flat_map(|activity| {
                BestAverageExtractor::averageable_streams(activity)
                    .into_iter()
                    .map(move |stream_type| (activity, stream_type))
            })
            .collect();
        let pending: Vec<(&Activity, StreamType)> = candidates
            .iter()
            .copied()
            .filter(|(activity, stream_type)| {
                !store.exists(&StreamKey::new(activity.id.clone(), *stream_type))
            })
            .collect();
        let skipped_cached = candidates.len() - pending.len();

        debug!(pending = pending.len(), skipped_cached, "Scheduling best averages");

        let progress = self.progress_bar(pending.len(), "best averages");
        let results: Vec<(StreamKey, BestAverages)> = self.in_pool(|| {
            pending
                .par_iter()
                .filter_map(|(activity, stream_type)| {
                    let averages = self.averages.extract(activity, *stream_type);
                    if let Some(pb) = &progress {
                        pb.inc(1);
                    }
                    averages.map(|a| (StreamKey::new(activity.id.clone(), *stream_type), a))
                })
                .collect()
        })?;
        finish(progress);

        let computed = results.len();
        for (key, averages) in results {
            store.put(key, averages);
        }

        let summary = BatchSummary {
            total: candidates.len(),
            computed,
            skipped_cached,
            duration_ms: start.elapsed().as_millis(),
        };

        info!("{}", summary.to_string_pretty());
        Ok(summary)
    }

    /// Simplify the curve of every activity over `channels`.
    ///
    /// Results keep the order of `activities`; activities without a usable
    /// distance stream carry their error.
    #[tracing::instrument(skip_all, fields(activities = activities.len()))]
    pub fn simplify_curves(
        &self,
        activities: &[Activity],
        channels: &[StreamType],
    ) -> Result<Vec<(ActivityId, std::result::Result<SimplifiedCurve, CalculationError>)>> {
        let progress = self.progress_bar(activities.len(), "curves");
        let results: Vec<_> = self.in_pool(|| {
            activities
                .par_iter()
                .map(|activity| {
                    let curve = self.simplifier.simplify_activity(activity, channels);
                    if let Err(e) = &curve {
                        warn!(activity_id = %activity.id, error = %e, "Curve simplification failed");
                    }
                    if let Some(pb) = &progress {
                        pb.inc(1);
                    }
                    (activity.id.clone(), curve)
                })
                .collect()
        })?;
        finish(progress);

        Ok(results)
    }

    /// Run `op` on a dedicated pool when a thread count is configured
    fn in_pool<R, F>(&self, op: F) -> Result<R>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match self.config.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| {
                        StrideError::Configuration(format!("Failed to create thread pool: {}", e))
                    })?;
                Ok(pool.install(op))
            }
            None => Ok(op()),
        }
    }

    fn progress_bar(&self, len: usize, label: &'static str) -> Option<ProgressBar> {
        if !self.config.show_progress || len == 0 {
            return None;
        }

        let pb = ProgressBar::new(len as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(label);
        Some(pb)
    }
}

fn finish(progress: Option<ProgressBar>) {
    if let Some(pb) = progress {
        pb.finish_with_message("Complete");
    }
}
