/// Neural jump ODE model
use candle_core::{Result, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};

use crate::config::ModelConfig;
use crate::layers::{softplus, Mlp};

pub mod solver;

/// Latent state of one sequence during integration
///
/// `c` evolves continuously under the drift; `h` additionally receives
/// discontinuous updates at observed event times and decays between
/// them.
#[derive(Debug, Clone)]
pub struct LatentState {
    /// Continuous component: [1, dim_c]
    pub c: Tensor,
    /// Jump-updated component: [1, dim_h]
    pub h: Tensor,
}

impl LatentState {
    /// Create new state from components
    pub fn new(c: Tensor, h: Tensor) -> Self {
        Self { c, h }
    }

    /// Initial state: learnable `c0`, zeroed `h0`
    pub fn initial(c0: &Tensor, dim_h: usize) -> Result<Self> {
        let h = Tensor::zeros((1, dim_h), c0.dtype(), c0.device())?;
        Ok(Self { c: c0.clone(), h })
    }

    /// Full state vector `(c, h)`: [1, dim_c + dim_h]
    pub fn concat(&self) -> Result<Tensor> {
        Tensor::cat(&[&self.c, &self.h], 1)
    }
}

/// Drift, jump and intensity functions of the latent point process
///
/// - Drift: `dc/dt = F(c, h)`, `dh/dt = -softplus(beta) * h` with a
///   learnable per-dimension decay rate `beta`
/// - Jump: at an event of type `k`, `h += G(c, h, e_k)`
/// - Intensity: `lambda = softplus(W (c, h) + b)`, one rate per type
pub struct OdeJumpFunc {
    config: ModelConfig,
    drift_net: Mlp,
    jump_net: Mlp,
    intensity_head: Linear,
    decay_raw: Tensor,
}

impl OdeJumpFunc {
    /// Create a new jump ODE function
    pub fn new(config: ModelConfig, vb: VarBuilder) -> crate::Result<Self> {
        config.validate()?;

        let dim_z = config.dim_latent();

        let drift_net = Mlp::new(
            dim_z,
            config.dim_hidden,
            config.dim_c,
            config.num_hidden,
            vb.pp("drift"),
        )?;

        let jump_net = Mlp::new(
            dim_z + config.num_types,
            config.dim_hidden,
            config.dim_h,
            config.num_hidden,
            vb.pp("jump"),
        )?;

        let intensity_head = linear(dim_z, config.num_types, vb.pp("intensity"))?;

        // softplus(0) gives a moderate initial decay rate
        let decay_raw =
            vb.get_with_hints((1, config.dim_h), "decay", candle_nn::Init::Const(0.0))?;

        Ok(Self {
            config,
            drift_net,
            jump_net,
            intensity_head,
            decay_raw,
        })
    }

    /// Model configuration
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Time derivative of the latent state between events.
    ///
    /// Returns `(dc/dt, dh/dt)`, each shaped like the corresponding
    /// state component.
    pub fn drift(&self, state: &LatentState) -> Result<(Tensor, Tensor)> {
        let z = state.concat()?;
        let dc = self.drift_net.forward(&z)?;
        let rate = softplus(&self.decay_raw)?;
        let dh = (&state.h * &rate)?.neg()?;
        Ok((dc, dh))
    }

    /// Conditional intensity over event types: [1, num_types], positive.
    pub fn intensity(&self, state: &LatentState) -> Result<Tensor> {
        softplus(&self.intensity_head.forward(&state.concat()?)?)
    }

    /// Apply the jump for an observed event of type `mark`.
    pub fn jump(&self, state: &LatentState, mark: usize) -> Result<LatentState> {
        let mut onehot = vec![0f32; self.config.num_types];
        onehot[mark] = 1.0;
        let onehot = Tensor::from_vec(onehot, (1, self.config.num_types), state.h.device())?
            .to_dtype(state.h.dtype())?;

        let input = Tensor::cat(&[&state.c, &state.h, &onehot], 1)?;
        let dh = self.jump_net.forward(&input)?;

        Ok(LatentState::new(state.c.clone(), (&state.h + dh)?))
    }

    /// Initial `c0` parameter registered under this function's varmap
    /// prefix. Kept here so checkpoints carry the initial state together
    /// with the network weights.
    pub fn init_c0(config: &ModelConfig, vb: &VarBuilder) -> Result<Tensor> {
        vb.get_with_hints(
            (1, config.dim_c),
            "c0",
            candle_nn::Init::Randn {
                mean: 0.0,
                stdev: 1.0,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn small_config() -> ModelConfig {
        ModelConfig {
            dim_c: 4,
            dim_h: 4,
            num_types: 3,
            dim_hidden: 8,
            num_hidden: 1,
            jump_type: crate::JumpType::Read,
            evnt_align: false,
            dt: 0.25,
        }
    }

    fn small_func(device: &Device) -> (OdeJumpFunc, VarMap) {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let func = OdeJumpFunc::new(small_config(), vb).unwrap();
        (func, varmap)
    }

    #[test]
    fn test_latent_state_shapes() -> Result<()> {
        let device = Device::Cpu;
        let c0 = Tensor::randn(0f32, 1.0, (1, 4), &device)?;

        let state = LatentState::initial(&c0, 4)?;
        assert_eq!(state.c.dims(), &[1, 4]);
        assert_eq!(state.h.dims(), &[1, 4]);
        assert_eq!(state.concat()?.dims(), &[1, 8]);

        // h starts at zero
        let h_sum = state.h.abs()?.sum_all()?.to_scalar::<f32>()?;
        assert_eq!(h_sum, 0.0);

        Ok(())
    }

    #[test]
    fn test_drift_shapes() -> Result<()> {
        let device = Device::Cpu;
        let (func, _varmap) = small_func(&device);

        let c0 = Tensor::randn(0f32, 1.0, (1, 4), &device)?;
        let state = LatentState::initial(&c0, 4)?;

        let (dc, dh) = func.drift(&state)?;
        assert_eq!(dc.dims(), &[1, 4]);
        assert_eq!(dh.dims(), &[1, 4]);

        // h is zero, so its decay derivative is zero too
        let dh_sum = dh.abs()?.sum_all()?.to_scalar::<f32>()?;
        assert_eq!(dh_sum, 0.0);

        Ok(())
    }

    #[test]
    fn test_intensity_positive() -> Result<()> {
        let device = Device::Cpu;
        let (func, _varmap) = small_func(&device);

        let c0 = Tensor::randn(0f32, 1.0, (1, 4), &device)?;
        let state = LatentState::initial(&c0, 4)?;

        let lam = func.intensity(&state)?;
        assert_eq!(lam.dims(), &[1, 3]);

        for v in lam.flatten_all()?.to_vec1::<f32>()? {
            assert!(v > 0.0);
            assert!(v.is_finite());
        }

        Ok(())
    }

    #[test]
    fn test_jump_updates_h_only() -> Result<()> {
        let device = Device::Cpu;
        let (func, _varmap) = small_func(&device);

        let c0 = Tensor::randn(0f32, 1.0, (1, 4), &device)?;
        let state = LatentState::initial(&c0, 4)?;

        let jumped = func.jump(&state, 1)?;

        // c untouched
        let dc = (&jumped.c - &state.c)?.abs()?.sum_all()?.to_scalar::<f32>()?;
        assert_eq!(dc, 0.0);

        // h generally changes (random init makes an exactly-zero update
        // vanishingly unlikely)
        let dh = (&jumped.h - &state.h)?.abs()?.sum_all()?.to_scalar::<f32>()?;
        assert!(dh > 0.0);

        Ok(())
    }
}
