pub mod commands;
pub mod config;
pub mod json;
pub mod logger;
