pub mod animal;
pub mod chat_message;
pub mod health_metric;
pub mod lab_test;
pub mod owner;

pub use animal::*;
pub use chat_message::*;
pub use health_metric::*;
pub use lab_test::*;
pub use owner::*;

use uuid::Uuid;

use super::DatabaseError;

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}
