pub mod admin;
pub mod app;
pub mod cli;
pub mod config;
pub mod highlight;
pub mod local;
pub mod model;
pub mod organize;
pub mod pins;
pub mod search;
pub mod storage;
pub mod sync;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
