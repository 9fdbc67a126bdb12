//! Configuration module for ycrawler
//!
//! Every option has a default, so the crawler runs without a config file.
//! A TOML file, when given, overrides the defaults, and command-line flags
//! override the file.
//!
//! # Example
//!
//! ```no_run
//! use ycrawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ycrawler.toml")).unwrap();
//! println!("Polling every {}s", config.crawler.repeat_interval_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, EndpointConfig, LoggingConfig, OutputConfig};

// Re-export parser functions
pub use parser::{config_fingerprint, load_config, read_config};
pub use validation::validate;
