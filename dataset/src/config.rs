use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    catalog::ListFormat,
    error::{DatasetError, Result},
};

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Inclusive `[min, max]` range of a randomized field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Display + Copy> Bounds<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    // `!(min <= max)` also rejects NaN bounds
    pub fn check(&self, name: &str) -> Result<()> {
        if !(self.min <= self.max) {
            return Err(DatasetError::invalid(format!(
                "{name}: min ({}) is greater than max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

impl Bounds<f64> {
    fn check_unit(&self, name: &str) -> Result<()> {
        self.check(name)?;
        if self.min < 0.0 || self.max > 1.0 {
            return Err(DatasetError::invalid(format!(
                "{name}: [{}, {}] is outside [0, 1]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Candidate part list.
    pub candidates: PathBuf,
    /// Directory of installed part models, one file per part id.
    pub assets: PathBuf,
    /// Root holding the `v<N>` run directories.
    pub output: PathBuf,
    #[serde(default)]
    pub list_format: ListFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Preview,
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub backend: Backend,
    /// Engine name forwarded to the host, e.g. "cycles" or "eevee".
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default = "default_resolution")]
    pub resolution: [u32; 2],
    #[serde(default)]
    pub command: Option<CommandConfig>,
}

fn default_engine() -> String {
    "cycles".to_string()
}

fn default_resolution() -> [u32; 2] {
    [512, 512]
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            engine: default_engine(),
            resolution: default_resolution(),
            command: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub count: Bounds<u32>,
    /// Point light power in watts.
    pub strength: Bounds<u32>,
    /// Distance from the part origin.
    pub radius: Bounds<u32>,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            count: Bounds::new(1, 3),
            strength: Bounds::new(500, 2000),
            radius: Bounds::new(3, 10),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    /// Applied to each RGB channel independently.
    pub diffuse: Bounds<f64>,
    pub metallic: Bounds<f64>,
    pub specular: Bounds<f64>,
    pub roughness: Bounds<f64>,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        let unit = Bounds::new(0.0, 1.0);
        Self {
            diffuse: unit,
            metallic: unit,
            specular: unit,
            roughness: unit,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsetConfig {
    pub offset: usize,
    /// `None` takes every valid part after `offset`.
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub samples_per_part: u32,
    /// Master seed. Drawn from the OS when absent.
    pub seed: Option<u64>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            samples_per_part: 1,
            seed: None,
        }
    }
}

/// Configuration resolved once at run start and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub paths: PathsConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub lights: LightConfig,
    #[serde(default)]
    pub material: MaterialConfig,
    #[serde(default)]
    pub subset: SubsetConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
}

impl GenerationConfig {
    /// Config with default ranges for the given locations.
    pub fn new(
        candidates: impl Into<PathBuf>,
        assets: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            paths: PathsConfig {
                candidates: candidates.into(),
                assets: assets.into(),
                output: output.into(),
                list_format: ListFormat::default(),
            },
            render: RenderConfig::default(),
            lights: LightConfig::default(),
            material: MaterialConfig::default(),
            subset: SubsetConfig::default(),
            dataset: DatasetConfig::default(),
        }
    }

    /// Reads and validates a TOML config. A missing file is replaced by a
    /// template and reported as [`DatasetError::ConfigMissing`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::warn!("config file not found at {}, writing template", path.display());
            write_template(path)?;
            return Err(DatasetError::ConfigMissing {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path)?;
        let cfg = Self::from_toml(&text).map_err(|err| match err {
            DatasetError::ParseConfig { source, .. } => DatasetError::ParseConfig {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        log::info!("loaded config {}", path.display());
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(text).map_err(|source| DatasetError::ParseConfig {
            path: PathBuf::new(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_ranges()?;

        let [w, h] = self.render.resolution;
        if w == 0 || h == 0 {
            return Err(DatasetError::invalid(format!(
                "render.resolution: {w}x{h} has a zero dimension"
            )));
        }
        if self.render.backend == Backend::Command && self.render.command.is_none() {
            return Err(DatasetError::invalid(
                "render.backend is \"command\" but [render.command] is missing",
            ));
        }
        if let ListFormat::Delimited { delimiter, .. } = self.paths.list_format {
            if !delimiter.is_ascii() {
                return Err(DatasetError::invalid(format!(
                    "paths.list_format.delimiter: {delimiter:?} is not ASCII"
                )));
            }
        }
        Ok(())
    }

    /// Checks every randomized range. Shared with the parameter generator.
    pub fn validate_ranges(&self) -> Result<()> {
        self.lights.count.check("lights.count")?;
        self.lights.strength.check("lights.strength")?;
        self.lights.radius.check("lights.radius")?;

        self.material.diffuse.check_unit("material.diffuse")?;
        self.material.metallic.check_unit("material.metallic")?;
        self.material.specular.check_unit("material.specular")?;
        self.material.roughness.check_unit("material.roughness")?;
        Ok(())
    }
}

pub const TEMPLATE: &str = r#"# Brick dataset generator config.

[paths]
# One part id per line. For delimited rows use
#   list_format = { mode = "delimited", delimiter = ",", column = 1 }
candidates = "bricks.txt"
# Installed part models, file stem is the part id (e.g. 3001.dat).
assets = "ldraw/parts"
output = "renders"
list_format = { mode = "lines" }

[render]
# "preview" draws a shaded silhouette, "command" runs [render.command].
backend = "preview"
engine = "cycles"
resolution = [512, 512]

# [render.command]
# program = "blender"
# args = ["--background", "--python", "render_job.py", "--"]

[lights]
count = { min = 1, max = 3 }
strength = { min = 500, max = 2000 }
radius = { min = 3, max = 10 }

[material]
diffuse = { min = 0.0, max = 1.0 }
metallic = { min = 0.0, max = 1.0 }
specular = { min = 0.0, max = 1.0 }
roughness = { min = 0.0, max = 1.0 }

[subset]
offset = 0
# count = 100

[dataset]
samples_per_part = 1
# seed = 42
"#;

pub fn write_template(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, TEMPLATE)?;
    Ok(())
}
