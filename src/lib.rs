pub mod app;
pub mod cli;
pub mod config;
pub mod detector;
pub mod extractor;
pub mod fingerprint;
pub mod frontier;
pub mod output;
pub mod queue;
pub mod runner;
pub mod seeds;
pub mod utils;

#[cfg(test)]
mod tests;
