pub mod api;
pub mod chat;
pub mod config;
pub mod db;
pub mod knowledge;
pub mod models;
pub mod openai;
pub mod pipeline;
