pub mod chart;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod fit;
pub mod panels;
pub mod render;
pub mod server;
