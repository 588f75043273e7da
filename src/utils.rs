/// Run output helpers
use std::path::{Path, PathBuf};
use std::process::Command;

/// Create (if needed) and return the output directory for a run,
/// `output/<name>/`.
pub fn create_outpath(name: &str) -> crate::Result<PathBuf> {
    let path = Path::new("output").join(name);
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Convert a manual interrupt (Ctrl+C) into a clean process exit.
pub fn install_interrupt_handler() -> crate::Result<()> {
    ctrlc::set_handler(|| std::process::exit(0))?;
    Ok(())
}

/// Short source-control revision used to name log files. Falls back to
/// a fixed string when the working tree is not a checkout.
pub fn source_revision() -> String {
    Command::new("git")
        .args(["log", "--pretty=format:%h", "-n", "1"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "norev".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_outpath() {
        let path = create_outpath("njsde_test_run").unwrap();
        assert!(path.exists());
        assert!(path.ends_with("output/njsde_test_run"));

        std::fs::remove_dir(&path).ok();
    }

    #[test]
    fn test_interrupt_handler_installs() {
        // A handler can be registered once per process; installation
        // itself must succeed.
        assert!(install_interrupt_handler().is_ok());
    }

    #[test]
    fn test_source_revision_nonempty() {
        // Either a real short hash or the fallback; never empty
        assert!(!source_revision().is_empty());
    }
}
