//! Core translation engine module

pub mod backup;
pub mod batch;
pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod provider;
