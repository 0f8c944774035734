pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod service;
pub mod types;
pub mod utils;

pub use config::{ApiKeys, Config, ConfigStore, DataDir};
pub use db::SqlEngine;
pub use error::{CodeMasterError, Result};
