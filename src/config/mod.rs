//! Configuration module for Onion-Crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so an empty file is a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use onion_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, IncludeConfig, OutputConfig, ProxyConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

// Re-export validation entry points
pub use validation::{check_crawl_limits, validate};
