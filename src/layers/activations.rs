/// Activation functions for the jump ODE model
///
/// CELU is used inside the drift/jump MLPs because it is continuously
/// differentiable, which matters when the network output is integrated.
/// Softplus keeps the decoded intensities and decay rates positive.
use candle_core::{Result, Tensor};

/// CELU activation: `max(0, x) + min(0, alpha * (exp(x / alpha) - 1))`
pub fn celu(x: &Tensor, alpha: f64) -> Result<Tensor> {
    let pos = x.relu()?;
    // min(0, y) written as -relu(-y)
    let y = (((x / alpha)?.exp()? - 1.0)? * alpha)?;
    let neg = y.neg()?.relu()?.neg()?;
    pos + neg
}

/// Numerically stable softplus: `max(0, x) + ln(1 + exp(-|x|))`
pub fn softplus(x: &Tensor) -> Result<Tensor> {
    let log1p = (x.abs()?.neg()?.exp()? + 1.0)?.log()?;
    x.relu()? + log1p
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn test_celu_matches_definition() -> Result<()> {
        let device = Device::Cpu;
        let x = Tensor::from_vec(vec![-2.0f32, -0.5, 0.0, 0.5, 2.0], 5, &device)?;

        let out = celu(&x, 1.0)?.to_vec1::<f32>()?;

        for (xi, oi) in [-2.0f32, -0.5, 0.0, 0.5, 2.0].iter().zip(out.iter()) {
            let expected = if *xi > 0.0 { *xi } else { xi.exp() - 1.0 };
            assert!(
                (oi - expected).abs() < 1e-5,
                "celu({}) = {}, expected {}",
                xi,
                oi,
                expected
            );
        }

        Ok(())
    }

    #[test]
    fn test_softplus_positive_and_stable() -> Result<()> {
        let device = Device::Cpu;
        let x = Tensor::from_vec(vec![-50.0f32, -1.0, 0.0, 1.0, 50.0], 5, &device)?;

        let out = softplus(&x)?.to_vec1::<f32>()?;

        // Always strictly positive, finite even for large magnitudes
        for v in &out {
            assert!(v.is_finite());
            assert!(*v >= 0.0);
        }

        // softplus(0) = ln(2)
        assert!((out[2] - std::f32::consts::LN_2).abs() < 1e-5);

        // Large positive inputs are passed through almost unchanged
        assert!((out[4] - 50.0).abs() < 1e-4);

        Ok(())
    }

    #[test]
    fn test_softplus_shape_preserved() -> Result<()> {
        let device = Device::Cpu;
        let x = Tensor::zeros((2, 7), DType::F32, &device)?;
        let out = softplus(&x)?;
        assert_eq!(out.dims(), x.dims());
        Ok(())
    }
}
