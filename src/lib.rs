pub mod agents;
pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;
