//! Configuration Module
//!
//! Environment-driven configuration for the stream client and REST glue.

mod settings;

pub use settings::{
    ClientConfig, ConfigError, DATA_BASE_URL, Environment, HttpSettings, STREAM_BASE_URL,
};
