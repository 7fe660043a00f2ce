//! Save directory discovery.
//!
//! A save root holds one directory per farm, named `<farm>_<id>`, with the
//! save file of the same name inside it.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::core_api::{CoreError, CoreErrorCode};

/// `$HOME/.config/StardewValley/Saves`, or `%APPDATA%\StardewValley\Saves`
/// on Windows.
pub fn default_save_root() -> Option<PathBuf> {
    if cfg!(windows) {
        env::var_os("APPDATA")
            .map(|appdata| PathBuf::from(appdata).join("StardewValley").join("Saves"))
    } else {
        env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("StardewValley")
                .join("Saves")
        })
    }
}

/// Every `<root>/<dir>/<dir>` save file, sorted by path.
pub fn list_saves(root: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let mut saves: Vec<PathBuf> = read_save_dirs(root)?
        .into_iter()
        .map(|dir| save_file_in(&dir))
        .filter(|file| file.is_file())
        .collect();
    saves.sort();
    Ok(saves)
}

/// The `<farm>_<id>` directory for `farm`. Directory names with more than one
/// underscore are not considered.
pub fn find_farm(root: &Path, farm: &str) -> Result<PathBuf, CoreError> {
    debug!("searching for farm {farm} in {}", root.display());
    let mut dirs = read_save_dirs(root)?;
    dirs.sort();
    for dir in dirs {
        let Some(dir_name) = dir.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if dir_name.matches('_').count() != 1 {
            continue;
        }
        let Some((name, id)) = dir_name.split_once('_') else {
            continue;
        };
        trace!("farm {name} id {id}");
        if name == farm {
            debug!("found {}", dir.display());
            return Ok(dir);
        }
    }
    Err(CoreError::not_found(format!(
        "failed to find farm {farm} in {}",
        root.display()
    )))
}

/// Resolves a user-supplied path to a save file. Relative paths are taken
/// relative to `root`; a directory resolves to the same-named file inside it.
pub fn resolve_save_file(path: &Path, root: &Path) -> Result<PathBuf, CoreError> {
    let candidate = if path.is_absolute() || path.exists() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    let file = if candidate.is_dir() {
        save_file_in(&candidate)
    } else {
        candidate
    };
    if !file.is_file() {
        return Err(CoreError::not_found(format!(
            "save file {} does not exist",
            file.display()
        )));
    }
    Ok(file)
}

fn save_file_in(dir: &Path) -> PathBuf {
    match dir.file_name() {
        Some(name) => dir.join(name),
        None => dir.to_path_buf(),
    }
}

fn read_save_dirs(root: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let entries = fs::read_dir(root).map_err(|e| {
        CoreError::new(
            CoreErrorCode::Io,
            format!("failed to read save directory {}: {e}", root.display()),
        )
    })?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to read entry in {}: {e}", root.display()),
            )
        })?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    Ok(dirs)
}
