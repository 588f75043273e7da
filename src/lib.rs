//! Neural jump ODE models for irregularly-timed event sequences
//!
//! A latent state evolves continuously between events under a learned
//! drift and is updated discontinuously at observed event times. The
//! conditional intensity of every event type is decoded from the latent
//! state, and the model is fit by maximising the point-process
//! log-likelihood of the observed (time, mark) sequences.
//!
//! # Architecture
//!
//! - **Drift**: an MLP giving the time derivative of the latent state
//!   between events
//! - **Jump**: an MLP applied to the latent state at each observed event
//! - **Intensity**: a softplus-linear head decoding per-type event rates
//!
//! # Example
//!
//! ```ignore
//! use njsde::{ModelConfig, OdeJumpFunc};
//!
//! let config = ModelConfig::default();
//! let func = OdeJumpFunc::new(config, vb)?;
//! ```

pub mod config;
pub mod data;
pub mod layers;
pub mod models;
pub mod training;
pub mod utils;

// Re-export commonly used items
pub use config::{JumpType, ModelConfig};
pub use models::OdeJumpFunc;

/// Library error types
#[derive(Debug, thiserror::Error)]
pub enum NjsdeError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Signal error: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NjsdeError>;
