pub mod commit_fetcher;
pub mod diff_fetcher;

pub use commit_fetcher::CommitFetcher;
pub use diff_fetcher::DiffFetcher;
