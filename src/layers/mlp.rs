/// Small MLP used for the drift and jump functions
use candle_core::{Result, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};

use super::activations::celu;

/// Multi-layer perceptron with CELU activations on the hidden layers
/// and a linear output layer.
pub struct Mlp {
    hidden: Vec<Linear>,
    out: Linear,
    alpha: f64,
}

impl Mlp {
    /// Create a new MLP
    ///
    /// # Arguments
    /// * `dim_in` - Input dimension
    /// * `dim_hidden` - Width of each hidden layer
    /// * `dim_out` - Output dimension
    /// * `num_hidden` - Number of hidden layers
    /// * `vb` - VarBuilder for parameter initialization
    pub fn new(
        dim_in: usize,
        dim_hidden: usize,
        dim_out: usize,
        num_hidden: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let mut hidden = Vec::with_capacity(num_hidden);
        let mut width = dim_in;
        for i in 0..num_hidden {
            hidden.push(linear(width, dim_hidden, vb.pp(format!("hidden_{}", i)))?);
            width = dim_hidden;
        }
        let out = linear(width, dim_out, vb.pp("out"))?;

        Ok(Self {
            hidden,
            out,
            alpha: 1.0,
        })
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mut x = x.clone();
        for layer in &self.hidden {
            x = celu(&layer.forward(&x)?, self.alpha)?;
        }
        self.out.forward(&x)
    }
}
