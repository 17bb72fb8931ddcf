pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod query;

pub use error::DocError;
pub use query::Query;
