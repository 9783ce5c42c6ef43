pub mod analytics;
pub mod api;
pub mod auth;
pub mod config;
pub mod logs;
pub mod models;
pub mod storage;
