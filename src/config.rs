/// Configuration for the neural jump ODE model
use std::str::FromStr;

/// How the latent state interacts with events during integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JumpType {
    /// No jumps: the latent state evolves as a pure ODE.
    None,
    /// Replay the observed events as jumps (training mode).
    Read,
}

impl FromStr for JumpType {
    type Err = crate::NjsdeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "none" => Ok(JumpType::None),
            "read" => Ok(JumpType::Read),
            other => Err(crate::NjsdeError::Config(format!(
                "unknown jump type '{}': must be 'none' or 'read'",
                other
            ))),
        }
    }
}

/// Model configuration for [`crate::OdeJumpFunc`]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelConfig {
    /// Dimension of the continuously-evolving latent component `c`
    pub dim_c: usize,

    /// Dimension of the jump-updated latent component `h`
    pub dim_h: usize,

    /// Number of distinct event types (marks)
    pub num_types: usize,

    /// Width of the hidden layers in the drift and jump MLPs
    pub dim_hidden: usize,

    /// Number of hidden layers in the drift and jump MLPs
    pub num_hidden: usize,

    /// Jump behaviour during integration
    pub jump_type: JumpType,

    /// Snap event times to the integration grid instead of inserting
    /// them as extra nodes
    pub evnt_align: bool,

    /// Fixed integration step size
    pub dt: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dim_c: 32,
            dim_h: 32,
            num_types: 75,
            dim_hidden: 64,
            num_hidden: 1,
            jump_type: JumpType::None,
            evnt_align: false,
            dt: 0.05,
        }
    }
}

impl ModelConfig {
    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.dim_c == 0 || self.dim_h == 0 {
            return Err(crate::NjsdeError::Config(
                "dim_c and dim_h must be > 0".to_string(),
            ));
        }

        if self.num_types == 0 {
            return Err(crate::NjsdeError::Config(
                "num_types must be > 0".to_string(),
            ));
        }

        if self.dim_hidden == 0 {
            return Err(crate::NjsdeError::Config(
                "dim_hidden must be > 0".to_string(),
            ));
        }

        if !(self.dt > 0.0) {
            return Err(crate::NjsdeError::Config(format!(
                "dt must be > 0, got {}",
                self.dt
            )));
        }

        Ok(())
    }

    /// Dimension of the full latent state `(c, h)`
    pub fn dim_latent(&self) -> usize {
        self.dim_c + self.dim_h
    }
}
