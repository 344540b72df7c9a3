pub mod classifier;
pub mod prompt;

pub use classifier::LlmClassifier;
