pub mod engine;
pub mod estimator;
pub mod expense_parser;
pub mod normalizer;
pub mod remote;
pub mod resolver;
pub mod review_cache;
pub mod window;

pub use crate::domain::model::{AggregationRequest, AggregationResult, ExpenseRange, RawRecord, Review};
pub use crate::domain::ports::{ExpenseApi, PlacesApi, Storage};
pub use crate::utils::error::Result;
