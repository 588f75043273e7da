/// Training loop for the neural jump ODE
use candle_core::{DType, Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use rand::Rng;
use std::path::{Path, PathBuf};

use crate::config::ModelConfig;
use crate::data::{sample_batch, EventSeq};
use crate::models::solver::forward_pass;
use crate::models::OdeJumpFunc;

use super::checkpoint::{checkpoint_name, load_checkpoint, save_checkpoint, CheckpointMetadata};
use super::meter::RunningAverageMeter;

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Number of training iterations
    pub niters: usize,
    /// Sequences per minibatch
    pub batch_size: usize,
    /// Save a checkpoint every N iterations
    pub nsave: usize,
    /// Learning rate
    pub learning_rate: f64,
    /// Weight decay
    pub weight_decay: f64,
    /// Directory for checkpoints and logs
    pub outpath: PathBuf,
    /// Checkpoint file suffix (appended to the iteration count)
    pub paramw: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            niters: 100,
            batch_size: 1,
            nsave: 10,
            learning_rate: 1e-3,
            weight_decay: 1e-5,
            outpath: PathBuf::from("output"),
            paramw: "params.safetensors".to_string(),
        }
    }
}

/// Evaluation summary for a held-out fold
#[derive(Debug, Clone)]
pub struct EvalReport {
    /// Negative log-likelihood per sequence
    pub loss: f64,
    /// Total observed events
    pub num_events: usize,
    /// Fraction of events whose type was mispredicted
    pub type_error_rate: f64,
}

/// Trainer for the jump ODE model
pub struct Trainer {
    func: OdeJumpFunc,
    c0: Tensor,
    varmap: VarMap,
    optimizer: AdamW,
    meter: RunningAverageMeter,
    model_config: ModelConfig,
    config: TrainingConfig,
    iteration: usize,
}

impl Trainer {
    /// Create new trainer with freshly initialized weights
    pub fn new(
        model_config: ModelConfig,
        training_config: TrainingConfig,
        device: Device,
    ) -> crate::Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        // c0 lives in the same varmap as the network so checkpoints and
        // the optimizer cover it; h0 stays zero and is not a parameter.
        let c0 = OdeJumpFunc::init_c0(&model_config, &vb.pp("func"))?;
        let func = OdeJumpFunc::new(model_config.clone(), vb.pp("func"))?;

        let optimizer_params = ParamsAdamW {
            lr: training_config.learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: training_config.weight_decay,
        };
        let optimizer = AdamW::new(varmap.all_vars(), optimizer_params)?;

        Ok(Self {
            func,
            c0,
            varmap,
            optimizer,
            meter: RunningAverageMeter::default(),
            model_config,
            config: training_config,
            iteration: 0,
        })
    }

    /// Current iteration counter
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Restore weights and the iteration counter from a checkpoint.
    /// Optimizer moments are not persisted and restart fresh.
    pub fn restore<P: AsRef<Path>>(&mut self, path: P) -> crate::Result<()> {
        let metadata = load_checkpoint(&mut self.varmap, path.as_ref())?;
        self.iteration = metadata.iteration;
        log::info!(
            "restored checkpoint {} at iteration {}",
            path.as_ref().display(),
            self.iteration
        );
        Ok(())
    }

    /// One optimization step on a sampled minibatch.
    ///
    /// Returns (per-sequence loss, type error count).
    pub fn train_step(
        &mut self,
        batch: &[&EventSeq],
        tspan: (f64, f64),
    ) -> crate::Result<(f64, usize)> {
        if batch.is_empty() {
            return Err(crate::NjsdeError::Training("empty minibatch".to_string()));
        }

        let out = forward_pass(
            &self.func,
            &self.c0,
            tspan,
            self.model_config.dt,
            batch,
            self.model_config.evnt_align,
        )?;

        let loss_val = out.loss.to_scalar::<f32>()? as f64 / batch.len() as f64;

        // backward_step computes gradients and updates parameters in place
        self.optimizer.backward_step(&out.loss)?;

        self.meter.update(loss_val);
        self.iteration += 1;

        Ok((loss_val, out.type_errors))
    }

    /// Run the training loop until `niters` iterations have completed.
    pub fn train<R: Rng>(
        &mut self,
        train_seqs: &[EventSeq],
        tspan: (f64, f64),
        rng: &mut R,
    ) -> crate::Result<()> {
        if train_seqs.is_empty() {
            return Err(crate::NjsdeError::Training(
                "training set is empty".to_string(),
            ));
        }

        while self.iteration < self.config.niters {
            // The progress line reports the pre-step counter, so the
            // first iteration logs as 0.
            let it = self.iteration;
            let batch = sample_batch(train_seqs, self.config.batch_size, rng);
            let (loss, type_errors) = self.train_step(&batch, tspan)?;

            log::info!("{}", progress_line(it, loss, self.meter.avg(), type_errors));

            if self.iteration % self.config.nsave == 0 {
                let path = self
                    .config
                    .outpath
                    .join(checkpoint_name(self.iteration, &self.config.paramw));
                let metadata = CheckpointMetadata {
                    iteration: self.iteration,
                    loss: Some(loss),
                };
                save_checkpoint(&self.varmap, &path, &metadata)?;
                log::info!("saved checkpoint to {}", path.display());
            }
        }

        Ok(())
    }

    /// Evaluate on a held-out fold without updating parameters.
    pub fn evaluate(&self, seqs: &[EventSeq], tspan: (f64, f64)) -> crate::Result<EvalReport> {
        if seqs.is_empty() {
            return Ok(EvalReport {
                loss: 0.0,
                num_events: 0,
                type_error_rate: 0.0,
            });
        }

        let refs: Vec<&EventSeq> = seqs.iter().collect();
        let out = forward_pass(
            &self.func,
            &self.c0,
            tspan,
            self.model_config.dt,
            &refs,
            self.model_config.evnt_align,
        )?;

        let loss = out.loss.to_scalar::<f32>()? as f64 / seqs.len() as f64;
        let type_error_rate = if out.num_events > 0 {
            out.type_errors as f64 / out.num_events as f64
        } else {
            0.0
        };

        Ok(EvalReport {
            loss,
            num_events: out.num_events,
            type_error_rate,
        })
    }
}

/// Progress line for one optimization step, indexed from 0.
fn progress_line(iteration: usize, loss: f64, running_avg: f64, type_errors: usize) -> String {
    format!(
        "iter: {}, current loss: {:10.4}, running ave loss: {:10.4}, type error: {}",
        iteration, loss, running_avg, type_errors
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JumpType;
    use crate::data::Event;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_model_config() -> ModelConfig {
        ModelConfig {
            dim_c: 4,
            dim_h: 4,
            num_types: 3,
            dim_hidden: 8,
            num_hidden: 1,
            jump_type: JumpType::Read,
            evnt_align: false,
            dt: 0.25,
        }
    }

    fn toy_seqs() -> Vec<EventSeq> {
        vec![
            vec![Event { time: 0.2, mark: 0 }, Event { time: 0.7, mark: 1 }],
            vec![Event { time: 0.5, mark: 2 }],
        ]
    }

    #[test]
    fn test_progress_line_indexes_from_zero() {
        // The first step logs index 0 even though the counter has
        // already advanced to 1 by the time the line is written.
        let line = progress_line(0, 2.5, 2.5, 1);
        assert!(line.starts_with("iter: 0,"));
        assert!(line.ends_with("type error: 1"));
    }

    #[test]
    fn test_train_runs_to_niters() -> crate::Result<()> {
        let training_config = TrainingConfig {
            niters: 2,
            batch_size: 2,
            nsave: 100, // no checkpoint during this test
            outpath: std::env::temp_dir(),
            ..Default::default()
        };

        let mut trainer = Trainer::new(small_model_config(), training_config, Device::Cpu)?;
        let seqs = toy_seqs();
        let mut rng = StdRng::seed_from_u64(0);

        trainer.train(&seqs, (0.0, 1.0), &mut rng)?;

        assert_eq!(trainer.iteration(), 2);
        assert!(trainer.meter.avg().is_finite());

        Ok(())
    }

    #[test]
    fn test_train_step_changes_loss_inputs() -> crate::Result<()> {
        let mut trainer = Trainer::new(
            small_model_config(),
            TrainingConfig {
                niters: 10,
                ..Default::default()
            },
            Device::Cpu,
        )?;

        let seqs = toy_seqs();
        let batch: Vec<&EventSeq> = seqs.iter().collect();

        let c0_before = trainer.c0.flatten_all()?.to_vec1::<f32>()?;
        let (loss, _) = trainer.train_step(&batch, (0.0, 1.0))?;
        let c0_after = trainer.c0.flatten_all()?.to_vec1::<f32>()?;

        assert!(loss.is_finite());
        // c0 is a trained parameter, the step must move it
        assert_ne!(c0_before, c0_after);

        Ok(())
    }

    #[test]
    fn test_empty_training_set_is_error() {
        let mut trainer = Trainer::new(
            small_model_config(),
            TrainingConfig::default(),
            Device::Cpu,
        )
        .unwrap();

        let mut rng = StdRng::seed_from_u64(0);
        assert!(trainer.train(&[], (0.0, 1.0), &mut rng).is_err());
    }

    #[test]
    fn test_evaluate_reports_events() -> crate::Result<()> {
        let trainer = Trainer::new(
            small_model_config(),
            TrainingConfig::default(),
            Device::Cpu,
        )?;

        let seqs = toy_seqs();
        let report = trainer.evaluate(&seqs, (0.0, 1.0))?;

        assert_eq!(report.num_events, 3);
        assert!(report.loss.is_finite());
        assert!((0.0..=1.0).contains(&report.type_error_rate));

        // Empty fold short-circuits
        let empty = trainer.evaluate(&[], (0.0, 1.0))?;
        assert_eq!(empty.num_events, 0);
        assert_eq!(empty.loss, 0.0);

        Ok(())
    }

    #[test]
    fn test_save_and_restore_iteration() -> crate::Result<()> {
        let dir = std::env::temp_dir();
        let paramw = format!("njsde_trainer_{}.safetensors", std::process::id());

        let training_config = TrainingConfig {
            niters: 1,
            batch_size: 1,
            nsave: 1, // save on the first iteration
            outpath: dir.clone(),
            paramw: paramw.clone(),
            ..Default::default()
        };

        let mut trainer = Trainer::new(small_model_config(), training_config.clone(), Device::Cpu)?;
        let seqs = toy_seqs();
        let mut rng = StdRng::seed_from_u64(0);
        trainer.train(&seqs, (0.0, 1.0), &mut rng)?;

        let path = dir.join(checkpoint_name(1, &paramw));
        assert!(path.exists());

        let mut fresh = Trainer::new(small_model_config(), training_config, Device::Cpu)?;
        fresh.restore(&path)?;
        assert_eq!(fresh.iteration(), 1);

        std::fs::remove_file(&path).ok();
        std::fs::remove_file(format!("{}.json", path.display())).ok();

        Ok(())
    }
}
