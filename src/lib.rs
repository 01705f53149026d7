pub mod types;
pub mod config;
pub mod fetcher;
pub mod normalizer;
pub mod aggregator;
pub mod assembler;
pub mod server;

pub use types::*;
pub use config::Config;
pub use fetcher::{FetchSubscription, Fetcher};
pub use normalizer::{NameCounter, Normalizer};
pub use aggregator::Aggregator;
