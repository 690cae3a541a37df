// Library interface for stridemetrics modules
// This allows integration tests and the CLI to access the core functionality

pub mod batch;
pub mod best_average;
pub mod best_effort;
pub mod config;
pub mod epsilon;
pub mod error;
pub mod logging;
pub mod models;
pub mod simplify;
pub mod store;
pub mod streams;
pub mod training_load;
pub mod trimp;

// Re-export commonly used types for convenience
pub use models::*;
pub use batch::{BatchConfig, BatchRunner, BatchSummary};
pub use best_average::{BestAverageConfig, BestAverageExtractor};
pub use best_effort::{BestEffortConfig, BestEffortExtractor};
pub use config::EngineConfig;
pub use epsilon::{ActivityAggregates, EpsilonEstimator, SimplificationConfig};
pub use error::{CalculationError, Result, StrideError};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use simplify::{CurveSimplifier, SimplifiedCurve};
pub use store::{DerivedStore, InMemoryStore};
pub use streams::{CurvePoint, StreamCombiner};
pub use training_load::{
    TrainingLoadCalculator, TrainingLoadConfig, TrainingLoadReport, TrainingLoadSummary,
    TsbInterpretation,
};
pub use trimp::TrimpCalculator;
