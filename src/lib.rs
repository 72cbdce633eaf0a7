pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod query;
pub mod scorer;
pub mod store;
pub mod threshold;

pub use config::Config;
pub use engine::Collaborators;
pub use error::{ParseError, ScoreError};
pub use scorer::{Comparison, ScoreReport, Scorer};
pub use store::MetricsStore;
