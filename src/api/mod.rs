//! HTTP API: router, handlers, error mapping.

pub mod endpoints;
pub mod error;
pub mod messages;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use types::AppContext;
