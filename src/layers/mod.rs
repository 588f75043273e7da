/// Numeric layer primitives
///
/// This module contains the building blocks for the jump ODE model:
/// - Activations (CELU, numerically-stable softplus)
/// - Small MLPs used for the drift and jump functions

pub mod activations;
pub mod mlp;

pub use activations::{celu, softplus};
pub use mlp::Mlp;
