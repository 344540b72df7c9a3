// Core modules
pub mod ai;
pub mod config;
pub mod diff_filter;
pub mod error;
pub mod github;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod retry;
pub mod storage;
pub mod token_budget;

pub use config::Config;
pub use error::{Result, TrackerError};
pub use pipeline::DecisionAggregator;
pub use storage::ContributionStore;
