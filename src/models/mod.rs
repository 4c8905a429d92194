pub mod animal;
pub mod chat;
pub mod enums;
pub mod health_metric;
pub mod owner;

pub use animal::*;
pub use chat::*;
pub use health_metric::*;
pub use lab_test::*;
pub use owner::*;
