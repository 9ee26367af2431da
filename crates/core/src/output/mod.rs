pub mod output_config;
pub mod service;
pub mod transport;
