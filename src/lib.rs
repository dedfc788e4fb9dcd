pub mod config;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod stats;
