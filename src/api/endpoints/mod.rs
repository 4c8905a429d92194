pub mod animals;
pub mod chat;
pub mod data;
pub mod health;
pub mod metrics;
pub mod ocr;
pub mod owners;
