pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod geo;
pub mod highlight;
pub mod map;
pub mod search;
pub mod session;
pub mod stats;
pub mod storage;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
