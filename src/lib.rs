pub mod admin;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod guests;
pub mod state;
pub mod stats;
