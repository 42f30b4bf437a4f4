pub mod analyzers;
pub mod config;
pub mod fetch;
pub mod history;
pub mod items;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod snapshot;
pub mod stats;
