pub mod analytics;
pub mod commands;
pub mod config;
pub mod context;
pub mod indicators;
pub mod market_data;
pub mod models;
pub mod portfolio;
mod retry;
pub mod scan_status;
pub mod scanner;
pub mod store;
pub mod universe;
pub mod yahoo;
