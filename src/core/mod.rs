//! Core data models and the capacity query pipeline.

pub mod aggregate;
pub mod credential;
pub mod http;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod summary;

pub use aggregate::{CapacityRow, CapacityTable, RegionGroup, aggregate, aggregate_by_tier};
pub use credential::{
    AccessToken, AzureCliCredential, CredentialProvider, DefaultCredential, EnvCredential,
    StaticCredential,
};
pub use http::RetryPolicy;
pub use models::{
    CapacityRecord, ModelQueryError, ModelQuerySpec, QueryReport, QueryState, RobotOutput,
};
pub use normalize::normalize;
pub use pipeline::CapacityClient;
pub use summary::{ModelSummary, RegionCapacity, summarize};
