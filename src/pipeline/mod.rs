pub mod aggregator;
pub mod grouper;

pub use aggregator::DecisionAggregator;
