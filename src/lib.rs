pub mod bot;
pub mod commands;
pub mod config;
pub mod error;
pub mod ollama;
pub mod relay;
pub mod types;
pub mod weather;

#[cfg(test)]
mod test_support;

pub use bot::run;
