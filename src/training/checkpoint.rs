/// Model checkpointing with safetensors
///
/// Weights (including the learnable initial state `c0`) are written
/// through the varmap as safetensors; the iteration counter and last
/// loss go into a JSON sidecar next to the weight file.
use std::path::{Path, PathBuf};

use candle_nn::VarMap;

/// Checkpoint metadata
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CheckpointMetadata {
    /// Training iteration at save time
    pub iteration: usize,
    /// Loss at checkpoint
    pub loss: Option<f64>,
}

/// Checkpoint file name for a given iteration: `{iter:05}{suffix}`
pub fn checkpoint_name(iteration: usize, suffix: &str) -> String {
    format!("{:05}{}", iteration, suffix)
}

fn metadata_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.json", path.display()))
}

/// Save all varmap tensors plus metadata.
pub fn save_checkpoint<P: AsRef<Path>>(
    varmap: &VarMap,
    path: P,
    metadata: &CheckpointMetadata,
) -> crate::Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }

    varmap.save(path)?;

    let json = serde_json::to_string_pretty(metadata)?;
    std::fs::write(metadata_path(path), json)?;

    Ok(())
}

/// Load tensors into an existing varmap (the model must already be
/// built so every variable is registered). Returns the stored metadata;
/// a missing sidecar yields defaults.
pub fn load_checkpoint<P: AsRef<Path>>(
    varmap: &mut VarMap,
    path: P,
) -> crate::Result<CheckpointMetadata> {
    let path = path.as_ref();

    varmap.load(path)?;

    let meta_path = metadata_path(path);
    if meta_path.exists() {
        let json = std::fs::read_to_string(meta_path)?;
        Ok(serde_json::from_str(&json)?)
    } else {
        Ok(CheckpointMetadata::default())
    }
}
