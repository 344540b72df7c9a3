pub mod aggregates;
pub mod store;

pub use store::ContributionStore;
