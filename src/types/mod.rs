//! Data types shared by the cache, providers and backends.

pub mod batch;
pub mod http;
pub mod model;
pub mod prompt;

pub use batch::*;
pub use http::*;
pub use model::*;
pub use prompt::*;
