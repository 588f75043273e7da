/// Training infrastructure for the jump ODE model

pub mod checkpoint;
pub mod meter;
pub mod trainer;

pub use checkpoint::{checkpoint_name, load_checkpoint, save_checkpoint, CheckpointMetadata};
pub use meter::RunningAverageMeter;
pub use trainer::{EvalReport, Trainer, TrainingConfig};
