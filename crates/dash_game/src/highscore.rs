//! High score persistence: one decimal integer in a text file next to the
//! executable. Any failure degrades to a score of 0 or a dropped save.

use std::fs;
use std::path::{Path, PathBuf};

/// `file_name` in the executable's directory, or in the working directory
/// when the executable path is unavailable.
pub fn high_score_path(file_name: &str) -> PathBuf {
    match std::env::current_exe() {
        Ok(exe) => match exe.parent() {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        },
        Err(e) => {
            log::warn!("Executable path unavailable ({e}), using working directory");
            PathBuf::from(file_name)
        }
    }
}

pub fn load_high_score(path: &Path) -> u32 {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => {
            log::info!("No high score file at {}, starting with 0", path.display());
            return 0;
        }
    };
    match raw.trim().parse::<u32>() {
        Ok(score) => {
            log::info!("Loaded high score: {score}");
            score
        }
        Err(e) => {
            log::error!("Ignoring high score file {}: {e}", path.display());
            0
        }
    }
}

pub fn save_high_score(path: &Path, score: u32) -> Result<(), String> {
    fs::write(path, score.to_string())
        .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
    log::info!("Saved high score: {score}");
    Ok(())
}
