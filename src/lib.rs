pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod reports;
pub mod resources;
pub mod session;
pub mod views;
