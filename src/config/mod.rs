//! Configuration Module
//! 
//! Runtime settings for the establisher, relay, navigator and logging.

pub mod manager;
pub mod types;

pub use manager::ConfigManager;
pub use types::*;
