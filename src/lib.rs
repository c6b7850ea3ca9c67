pub mod args;
pub mod config;
pub mod engine;
pub mod error;
pub mod macros;
pub mod matching;
pub mod platform;
pub mod runner;
pub mod state;

#[cfg(test)]
mod test_support;

pub use engine::Engine;
pub use error::{SetupError, SetupResult};
pub use state::SharedState;
