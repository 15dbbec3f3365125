use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{DatasetError, Result};

/// Parses `v<N>` with `N >= 1`. Anything else is not a version directory.
/// Numbers past `u64::MAX` saturate, so they still rank above every other
/// version and leave no successor.
pub fn parse_version(name: &str) -> Option<u64> {
    let digits = name.strip_prefix('v')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n = digits.bytes().try_fold(0u64, |acc, b| {
        acc.checked_mul(10)?.checked_add(u64::from(b - b'0'))
    });
    match n {
        Some(0) => None,
        Some(n) => Some(n),
        None => Some(u64::MAX),
    }
}

/// Highest `v<N>` among the immediate sub-directories of `root`.
pub fn latest_version(root: &Path) -> Result<Option<u64>> {
    let mut latest = None;
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(n) = entry.file_name().to_str().and_then(parse_version) else {
            continue;
        };
        latest = latest.max(Some(n));
    }
    Ok(latest)
}

/// Number the next run under an existing `root` would get.
pub fn next_number(root: &Path) -> Result<u64> {
    match latest_version(root)? {
        None => Ok(1),
        Some(n) => n.checked_add(1).ok_or_else(|| DatasetError::VersionExhausted {
            root: root.to_path_buf(),
        }),
    }
}

/// Path of the next run directory under `root`, creating `root` if needed.
/// The returned path does not exist yet.
pub fn next_version(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        fs::create_dir_all(root)?;
        log::warn!("no previous version under {}, assuming v1", root.display());
    }
    let next = next_number(root)?;
    let dir = root.join(format!("v{next}"));
    if dir.exists() {
        return Err(DatasetError::VersionCollision { path: dir });
    }
    Ok(dir)
}

/// [`next_version`] plus creation of the directory itself.
pub fn create_next_version(root: &Path) -> Result<PathBuf> {
    let dir = next_version(root)?;
    fs::create_dir(&dir).map_err(|err| match err.kind() {
        std::io::ErrorKind::AlreadyExists => DatasetError::VersionCollision { path: dir.clone() },
        _ => err.into(),
    })?;
    log::info!("output directory: {}", dir.display());
    Ok(dir)
}
