// Library exports for placeviz

pub mod aggregate;
pub mod binning;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod parser;
pub mod predicate;
pub mod reconcile;
pub mod request;
pub mod response;
pub mod store;
pub mod trend;

pub use config::ExplorerConfig;
pub use data::Dataset;
pub use engine::Explorer;
pub use error::{ExplorerError, Result};
pub use request::UpdateRequest;
pub use response::{OptionsResponse, UpdateResponse};
pub use store::DataStore;
