use std::{
    collections::{HashMap, HashSet},
    fmt,
    fs::{self, File},
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// Catalog id of a single part, e.g. `3001`. Never empty and always a
/// single plain path component, since ids name output files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PartId(String);

impl PartId {
    /// Trims surrounding whitespace. Returns `None` for blank tokens, `.`,
    /// `..` and anything holding a path separator.
    pub fn new(raw: &str) -> Option<Self> {
        let id = raw.trim();
        let plain = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\'])
            && !id.contains('\0');
        plain.then(|| Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Layout of the candidate part list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ListFormat {
    /// One id per line.
    #[default]
    Lines,
    /// Delimited rows without header, id in the 0-based `column`.
    Delimited {
        #[serde(default = "default_delimiter")]
        delimiter: char,
        #[serde(default = "default_column")]
        column: usize,
    },
}

fn default_delimiter() -> char {
    ','
}

fn default_column() -> usize {
    1
}

/// Candidate parts split by whether a model is installed for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartCatalog {
    pub valid: Vec<PartId>,
    pub invalid: Vec<PartId>,
    /// Model file of every valid part.
    pub models: HashMap<PartId, PathBuf>,
}

impl PartCatalog {
    /// Stable partition of `candidates`. Both sides keep input order.
    pub fn partition(candidates: Vec<PartId>, installed: &HashSet<PartId>) -> Self {
        let (valid, invalid) = candidates
            .into_iter()
            .partition(|id| installed.contains(id));
        Self {
            valid,
            invalid,
            models: HashMap::new(),
        }
    }

    pub fn resolve(candidates_path: &Path, assets_dir: &Path, format: ListFormat) -> Result<Self> {
        log::info!("candidate list: {}", candidates_path.display());
        log::info!("assets dir: {}", assets_dir.display());

        let candidates = read_candidates(candidates_path, format)?;
        let mut models = installed_models(assets_dir)?;
        let installed: HashSet<PartId> = models.keys().cloned().collect();
        let total = candidates.len();
        let mut catalog = Self::partition(candidates, &installed);
        let valid: HashSet<&PartId> = catalog.valid.iter().collect();
        models.retain(|id, _| valid.contains(id));
        catalog.models = models;

        log::info!(
            "parts: {total} candidates, {} installed, {} valid, {} invalid",
            installed.len(),
            catalog.valid.len(),
            catalog.invalid.len()
        );
        if !catalog.invalid.is_empty() {
            log::debug!("invalid parts: {:?}", catalog.invalid);
        }
        Ok(catalog)
    }

    /// `valid[offset..offset + count]`, truncated at the end of the list.
    pub fn select(&self, offset: usize, count: Option<usize>) -> &[PartId] {
        let start = offset.min(self.valid.len());
        let end = match count {
            Some(n) => start.saturating_add(n).min(self.valid.len()),
            None => self.valid.len(),
        };
        &self.valid[start..end]
    }

    pub fn model(&self, part: &PartId) -> Option<&Path> {
        self.models.get(part).map(PathBuf::as_path)
    }
}

pub fn read_candidates(path: &Path, format: ListFormat) -> Result<Vec<PartId>> {
    if !path.is_file() {
        return Err(DatasetError::NotFound {
            what: "candidate list",
            path: path.to_path_buf(),
        });
    }
    match format {
        ListFormat::Lines => {
            let reader = BufReader::new(File::open(path)?);
            let mut ids = Vec::new();
            for (n, line) in reader.lines().enumerate() {
                let line = line?;
                match PartId::new(&line) {
                    Some(id) => ids.push(id),
                    None if line.trim().is_empty() => {}
                    None => log::warn!(
                        "{}:{}: {:?} is not a usable part id, skipped",
                        path.display(),
                        n + 1,
                        line.trim()
                    ),
                }
            }
            Ok(ids)
        }
        ListFormat::Delimited { delimiter, column } => {
            let delimiter = u8::try_from(delimiter)
                .ok()
                .filter(u8::is_ascii)
                .ok_or_else(|| {
                    DatasetError::invalid(format!(
                        "paths.list_format.delimiter: {delimiter:?} is not ASCII"
                    ))
                })?;
            read_delimited(path, delimiter, column).map_err(|source| DatasetError::CandidateList {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

fn read_delimited(path: &Path, delimiter: u8, column: usize) -> csv::Result<Vec<PartId>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_path(path)?;

    let mut ids = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        match record.get(column).and_then(PartId::new) {
            Some(id) => ids.push(id),
            None if record.iter().all(|f| f.is_empty()) => {}
            None => log::warn!(
                "{}:{}: no part id in column {column}, row skipped",
                path.display(),
                line + 1
            ),
        }
    }
    Ok(ids)
}

/// Installed part models keyed by file stem. When two files share a stem
/// the lexicographically smaller path wins, so the choice is stable.
pub fn installed_models(dir: &Path) -> Result<HashMap<PartId, PathBuf>> {
    if !dir.is_dir() {
        return Err(DatasetError::NotFound {
            what: "assets directory",
            path: dir.to_path_buf(),
        });
    }
    let mut models: HashMap<PartId, PathBuf> = HashMap::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let path = entry.path();
        let Some(id) = path.file_stem().and_then(|s| s.to_str()).and_then(PartId::new) else {
            log::debug!("ignoring asset {}", path.display());
            continue;
        };
        models
            .entry(id)
            .and_modify(|kept| {
                if path < *kept {
                    *kept = path.clone();
                }
            })
            .or_insert(path);
    }
    Ok(models)
}
