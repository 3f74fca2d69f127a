pub mod cache;
pub mod config;
pub mod error;
pub mod frame;
pub mod geo_data;
pub mod join;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod resolver;
pub mod sink;
pub mod source;

// Re-export the types most callers need
pub use config::{DateWindow, IntegrationConfig};
pub use error::{IntegrationError, Result, UnresolvedLocationCode};
pub use join::{Granularity, GranularityJoiner, JoinOptions};
pub use normalize::LocationNormalizer;
pub use pipeline::{IntegrationPipeline, RunSummary};
pub use resolver::{CountryLookup, CountryResolver, FuzzyCountryLookup};
