/// MIMIC-II training driver for the neural jump ODE
use candle_core::Device;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

use njsde::data::EventDataset;
use njsde::training::{Trainer, TrainingConfig};
use njsde::utils::{create_outpath, install_interrupt_handler, source_revision};
use njsde::{JumpType, ModelConfig};

/// Train a neural jump ODE on the MIMIC-II event sequences.
#[derive(Parser, Debug)]
#[command(name = "mimic2")]
struct Args {
    /// Number of training iterations
    #[arg(long, default_value_t = 100)]
    niters: usize,

    /// Jump behaviour: "none" (evaluate only) or "read" (train on
    /// observed events)
    #[arg(long = "jump_type", default_value = "none")]
    jump_type: String,

    /// Checkpoint to restore from (with --restart)
    #[arg(long, default_value = "params.safetensors")]
    paramr: String,

    /// Checkpoint file suffix for periodic saves
    #[arg(long, default_value = "params.safetensors")]
    paramw: String,

    /// Sequences per minibatch
    #[arg(long = "batch_size", default_value_t = 1)]
    batch_size: usize,

    /// Save a checkpoint every N iterations
    #[arg(long, default_value_t = 10)]
    nsave: usize,

    /// Cross-validation fold (0..5)
    #[arg(long, default_value_t = 0)]
    fold: usize,

    /// Resume from the --paramr checkpoint
    #[arg(long)]
    restart: bool,

    /// Snap event times to the integration grid
    #[arg(long = "evnt_align")]
    evnt_align: bool,

    /// Fix all randomness to seed 0
    #[arg(long)]
    seed0: bool,

    /// Log to stderr instead of the run log file
    #[arg(long)]
    debug: bool,
}

fn init_logging(outpath: &Path, revision: &str, debug: bool) -> anyhow::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if !debug {
        let log_file = std::fs::File::create(outpath.join(format!("{}.log", revision)))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }

    builder.init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // A manual interrupt ends the run cleanly; checkpoints written so
    // far stay usable for --restart.
    install_interrupt_handler()?;

    let outpath = create_outpath("mimic2")?;
    let revision = source_revision();
    init_logging(&outpath, &revision, args.debug)?;
    log::info!("{:?}", args);

    if let Err(err) = run(&args, &outpath) {
        if !args.debug {
            let err_path = outpath.join(format!("{}.err", revision));
            std::fs::write(&err_path, format!("{:#}\n", err)).ok();
        }
        log::error!("{:#}", err);
        return Err(err);
    }

    Ok(())
}

fn run(args: &Args, outpath: &Path) -> anyhow::Result<()> {
    let device = Device::Cpu;
    let mut rng = if args.seed0 {
        device.set_seed(0)?;
        StdRng::seed_from_u64(0)
    } else {
        StdRng::from_entropy()
    };

    let jump_type: JumpType = args.jump_type.parse()?;

    let mut dataset = EventDataset::from_files(
        "./data/mimic2/time.txt",
        "./data/mimic2/event.txt",
        1.0,
        1.0,
        1.0,
    )?;
    dataset.shuffle(&mut rng);
    log::info!(
        "loaded {} sequences, {} event types, tspan {:?}",
        dataset.len(),
        dataset.num_types(),
        dataset.tspan()
    );

    let model_config = ModelConfig {
        dim_c: 32,
        dim_h: 32,
        num_types: 75,
        dim_hidden: 64,
        num_hidden: 1,
        jump_type,
        evnt_align: args.evnt_align,
        dt: 0.05,
    };

    if dataset.num_types() > model_config.num_types {
        anyhow::bail!(
            "dataset has {} event types but the model supports {}",
            dataset.num_types(),
            model_config.num_types
        );
    }

    let tspan = dataset.tspan();
    let (train_seqs, test_seqs) = dataset.fold_split(args.fold)?;
    log::info!(
        "fold {}: {} train / {} test sequences",
        args.fold,
        train_seqs.len(),
        test_seqs.len()
    );

    let training_config = TrainingConfig {
        niters: args.niters,
        batch_size: args.batch_size,
        nsave: args.nsave,
        learning_rate: 1e-3,
        weight_decay: 1e-5,
        outpath: outpath.to_path_buf(),
        paramw: args.paramw.clone(),
    };

    let mut trainer = Trainer::new(model_config, training_config, device)?;

    if args.restart {
        trainer.restore(&args.paramr)?;
    }

    // Fitting to observed histories only makes sense in "read" mode;
    // otherwise skip straight to evaluation.
    if jump_type == JumpType::Read {
        trainer.train(&train_seqs, tspan, &mut rng)?;
    }

    let report = trainer.evaluate(&test_seqs, tspan)?;
    log::info!(
        "iter: {:5}, testing loss: {:10.4}, num_evnts: {:8}, type error: {:.4}",
        trainer.iteration(),
        report.loss,
        report.num_events,
        report.type_error_rate
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_accept_underscore_flags() {
        let args = Args::try_parse_from([
            "mimic2",
            "--jump_type",
            "read",
            "--batch_size",
            "5",
            "--evnt_align",
            "--nsave",
            "20",
        ])
        .unwrap();

        assert_eq!(args.jump_type, "read");
        assert_eq!(args.batch_size, 5);
        assert!(args.evnt_align);
        assert_eq!(args.nsave, 20);
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["mimic2"]).unwrap();

        assert_eq!(args.niters, 100);
        assert_eq!(args.jump_type, "none");
        assert_eq!(args.batch_size, 1);
        assert_eq!(args.fold, 0);
        assert!(!args.restart);
        assert!(!args.evnt_align);
    }
}
