pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::EngineConfig;

pub use adapters::{FirestoreExpenseClient, LocalStorage, PlacesClient};
pub use crate::core::engine::ReviewEngine;
pub use crate::core::estimator::{EstimationStrategy, SpendingEstimator};
pub use domain::model::{
    AggregationRequest, AggregationResult, AggregationStatus, ResultSource, Review,
};
pub use utils::error::{EngineError, Result};
